use serde::Deserialize;

use crate::document::{Chart, ChartKind, ChartSeries, DataLabels, Font};
use crate::error::{ToolError, ToolResult};
use crate::layout::types::Rect;

use super::{RenderContext, Tool, series_palette};

/// Clustered column chart, legend below when shown.
pub struct BarChart;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BarChartData {
    pub title: Option<String>,
    pub categories: Vec<String>,
    pub series: Vec<SeriesData>,
    pub show_legend: bool,
    pub data_labels: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeriesData {
    pub name: String,
    pub values: Vec<f64>,
}

impl Tool for BarChart {
    type Data = BarChartData;

    fn render(&self, data: &BarChartData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        if let Some(bad) = data
            .series
            .iter()
            .find(|s| s.values.iter().any(|v| !v.is_finite()))
        {
            return Err(ToolError::new(format!("series '{}' has a non-finite value", bad.name)));
        }
        let palette = series_palette(ctx.theme);
        let series = data
            .series
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                // Values beyond the category list have nowhere to go.
                let mut values = s.values.clone();
                values.resize(data.categories.len(), 0.0);
                ChartSeries {
                    name: s.name.clone(),
                    values,
                    colors: vec![palette[idx % palette.len()]],
                }
            })
            .collect();
        let chart = Chart {
            kind: ChartKind::ClusteredBar,
            title: data.title.clone().filter(|t| !t.trim().is_empty()),
            categories: data.categories.clone(),
            series,
            show_legend: data.show_legend,
            data_labels: if data.data_labels {
                DataLabels::Value
            } else {
                DataLabels::None
            },
            font: Font::sized(ctx.theme.font_size).colored(ctx.text_color()),
        };
        ctx.sink.add_chart(geom, chart).set_name("Bar Chart");
        Ok(())
    }
}
