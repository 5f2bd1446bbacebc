use serde::Deserialize;

use crate::document::{Font, HAlign, VAlign};
use crate::error::ToolResult;
use crate::layout::types::{Rect, pt};
use crate::theme::Rgb;

use super::{RenderContext, Tool, text};

/// Height of the label strip drawn just above the area.
const LABEL_HEIGHT_PT: f64 = 20.0;

/// Equal-width sections with labels above and thin vertical rules between them.
pub struct LayoutSeparators;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LayoutSeparatorsData {
    pub sections: Vec<String>,
    pub style: SeparatorStyle,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SeparatorStyle {
    pub font_size: f32,
    pub bold: bool,
    pub font_color: Option<String>,
    /// Rule color.
    pub color: String,
}

impl Default for SeparatorStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            bold: true,
            font_color: None,
            color: "#888888".to_string(),
        }
    }
}

impl Tool for LayoutSeparators {
    type Data = LayoutSeparatorsData;

    fn render(&self, data: &LayoutSeparatorsData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        let n = data.sections.len();
        if n == 0 {
            return Ok(());
        }
        let style = &data.style;
        let section_w = geom.width / n as i64;
        let label_h = pt(LABEL_HEIGHT_PT);
        let font = Font::sized(style.font_size)
            .bold(style.bold)
            .colored(ctx.color(style.font_color.as_deref(), ctx.text_color()));

        for (idx, label) in data.sections.iter().enumerate() {
            let left = geom.left + idx as i64 * section_w;
            let frame = text(label, font.clone(), HAlign::Center, VAlign::Bottom);
            ctx.sink
                .add_textbox(Rect::new(left, geom.top - label_h, section_w, label_h), frame)
                .set_name(format!("Section Label {}", idx + 1));
        }

        let rule = ctx.color(Some(&style.color), Rgb::new(0x88, 0x88, 0x88));
        for idx in 1..n {
            let left = geom.left + idx as i64 * section_w;
            ctx.sink
                .add_rect(Rect::new(left, geom.top, pt(1.0), geom.height))
                .set_name(format!("Separator {idx}"))
                .set_fill(rule);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ShapeKind;
    use crate::tools::testing::{AREA, render_tool};
    use serde_json::json;

    #[test]
    fn labels_then_rules_between_sections() {
        let canvas = render_tool(
            LayoutSeparators,
            json!({"sections": ["Plan", "Build", "Run"]}),
            AREA,
        )
        .unwrap();
        assert_eq!(canvas.shapes.len(), 5);

        let labels: Vec<_> = canvas.shapes.iter().filter(|s| s.text.is_some()).collect();
        assert_eq!(labels.len(), 3);
        let section_w = AREA.width / 3;
        assert_eq!(labels[1].frame.left, AREA.left + section_w);
        assert_eq!(labels[0].frame.bottom(), AREA.top);

        let rules: Vec<_> = canvas
            .shapes
            .iter()
            .filter(|s| matches!(s.kind, ShapeKind::Rect))
            .collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].frame, Rect::new(AREA.left + section_w, AREA.top, pt(1.0), AREA.height));
        assert!(rules.iter().all(|r| r.line.is_none() && r.fill.is_some()));
    }

    #[test]
    fn no_sections_draws_nothing() {
        let canvas = render_tool(LayoutSeparators, json!({}), AREA).unwrap();
        assert!(canvas.shapes.is_empty());
    }
}
