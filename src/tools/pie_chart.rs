use serde::Deserialize;

use crate::document::{Chart, ChartKind, ChartSeries, DataLabels, Font};
use crate::error::{ToolError, ToolResult};
use crate::layout::types::Rect;

use super::{RenderContext, Tool, series_palette};

/// Single-series pie; the legend sits to the right when shown.
pub struct PieChart;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PieChartData {
    pub title: Option<String>,
    pub items: Vec<PieItem>,
    pub show_legend: bool,
    pub data_labels: DataLabels,
}

#[derive(Debug, Deserialize)]
pub struct PieItem {
    pub label: String,
    pub value: f64,
}

impl Tool for PieChart {
    type Data = PieChartData;

    fn render(&self, data: &PieChartData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        if let Some(bad) = data.items.iter().find(|i| !i.value.is_finite() || i.value < 0.0) {
            return Err(ToolError::new(format!(
                "slice '{}' needs a finite, non-negative value",
                bad.label
            )));
        }
        let palette = series_palette(ctx.theme);
        let chart = Chart {
            kind: ChartKind::Pie,
            title: data.title.clone().filter(|t| !t.trim().is_empty()),
            categories: data.items.iter().map(|i| i.label.clone()).collect(),
            series: vec![ChartSeries {
                name: "Share".to_string(),
                values: data.items.iter().map(|i| i.value).collect(),
                colors: (0..data.items.len()).map(|i| palette[i % palette.len()]).collect(),
            }],
            show_legend: data.show_legend,
            data_labels: data.data_labels,
            font: Font::sized(12.0).colored(ctx.text_color()),
        };
        ctx.sink.add_chart(geom, chart).set_name("Pie Chart");
        Ok(())
    }
}
