use serde::Deserialize;

use crate::document::{Font, HAlign, VAlign};
use crate::error::ToolResult;
use crate::layout::types::Rect;
use crate::theme::Rgb;

use super::{RenderContext, Tool, parse_align, parse_valign, text};

/// Filled rectangle holding a block of text.
pub struct PlainBox;

#[derive(Debug, Deserialize)]
pub struct PlainBoxData {
    pub text: String,
    #[serde(default)]
    pub style: PlainBoxStyle,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlainBoxStyle {
    pub font_size: f32,
    pub font_color: String,
    pub background_color: String,
    pub align: Option<String>,
    pub vertical_align: Option<String>,
}

impl Default for PlainBoxStyle {
    fn default() -> Self {
        Self {
            font_size: 18.0,
            font_color: "#000000".to_string(),
            background_color: "#F0F0F0".to_string(),
            align: None,
            vertical_align: None,
        }
    }
}

impl Tool for PlainBox {
    type Data = PlainBoxData;

    fn render(&self, data: &PlainBoxData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        let style = &data.style;
        let fill = ctx.color(Some(&style.background_color), Rgb::new(0xF0, 0xF0, 0xF0));
        let font = Font::sized(style.font_size).colored(ctx.color(Some(&style.font_color), Rgb::BLACK));
        let frame = text(
            &data.text,
            font,
            parse_align(style.align.as_deref(), HAlign::Left),
            parse_valign(style.vertical_align.as_deref(), VAlign::Middle),
        );
        ctx.sink
            .add_rect(geom)
            .set_name("Plain Box")
            .set_fill(fill)
            .set_text(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{AREA, render_tool};
    use serde_json::json;

    #[test]
    fn draws_one_filled_box_without_outline() {
        let canvas = render_tool(PlainBox, json!({"text": "Hello\nworld"}), AREA).unwrap();
        assert_eq!(canvas.shapes.len(), 1);
        let shape = &canvas.shapes[0];
        assert_eq!(shape.frame, AREA);
        assert_eq!(shape.fill, Some(Rgb::new(0xF0, 0xF0, 0xF0)));
        assert!(shape.line.is_none());
        let frame = shape.text.as_ref().unwrap();
        assert_eq!(frame.paragraphs.len(), 2);
        assert_eq!(frame.vertical, VAlign::Middle);
        assert_eq!(frame.runs().next().unwrap().font.size_pt, 18.0);
    }

    #[test]
    fn style_overrides_apply() {
        let canvas = render_tool(
            PlainBox,
            json!({
                "text": "x",
                "style": {"font_size": 10, "background_color": "#112233", "align": "right", "vertical_align": "top"}
            }),
            AREA,
        )
        .unwrap();
        let shape = &canvas.shapes[0];
        assert_eq!(shape.fill, Some(Rgb::new(0x11, 0x22, 0x33)));
        let frame = shape.text.as_ref().unwrap();
        assert_eq!(frame.align, HAlign::Right);
        assert_eq!(frame.vertical, VAlign::Top);
        assert_eq!(frame.runs().next().unwrap().font.size_pt, 10.0);
    }
}
