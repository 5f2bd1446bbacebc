use serde::Deserialize;

use crate::document::{DEFAULT_INSET_Y, Font, HAlign, VAlign};
use crate::error::ToolResult;
use crate::layout::types::Rect;
use super::{RenderContext, Tool, parse_align, text};

/// Rounded emphasis banner with bold, contrast-colored text.
pub struct MainMessage;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MainMessageData {
    pub main_message: String,
    pub color: Option<String>,
    /// Corner rounding, `0..=1` of the maximum.
    pub corner_radius: f64,
    pub style: Option<MainMessageStyle>,
}

impl Default for MainMessageData {
    fn default() -> Self {
        Self {
            main_message: String::new(),
            color: None,
            corner_radius: 0.2,
            style: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MainMessageStyle {
    pub font_size_body: f32,
    pub align: String,
}

impl Default for MainMessageStyle {
    fn default() -> Self {
        Self {
            font_size_body: 22.0,
            align: "left".to_string(),
        }
    }
}

impl Tool for MainMessage {
    type Data = MainMessageData;

    fn render(&self, data: &MainMessageData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        let style = data.style.as_ref();
        let primary = ctx.theme_color("primary", "#0D6EFD");
        let fill = ctx.color(
            data.color.as_deref().or_else(|| ctx.style_str("fill")),
            primary,
        );
        let font = Font::sized(style.map_or(22.0, |s| s.font_size_body))
            .bold(true)
            .colored(fill.contrast_text());
        let align = parse_align(style.map(|s| s.align.as_str()), HAlign::Left);

        // Half of the shorter side is fully round.
        let radius = data.corner_radius.clamp(0.0, 1.0) * 0.5;
        let margin = geom.width / 20;
        let frame = text(&data.main_message, font, align, VAlign::Middle);

        ctx.sink
            .add_round_rect(geom, radius)
            .set_name("Main Message")
            .set_fill(fill)
            .set_text(frame.with_inset(margin, DEFAULT_INSET_Y));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ShapeKind;
    use crate::theme::Rgb;
    use crate::tools::testing::{AREA, render_tool};
    use serde_json::json;

    #[test]
    fn banner_uses_primary_and_contrast_text() {
        let canvas = render_tool(MainMessage, json!({"main_message": "Ship it"}), AREA).unwrap();
        let banner = &canvas.shapes[0];
        assert!(matches!(banner.kind, ShapeKind::RoundRect { radius } if (radius - 0.1).abs() < 1e-9));
        assert_eq!(banner.fill, Some(Rgb::new(0x0D, 0x6E, 0xFD)));
        let text = banner.text.as_ref().unwrap();
        assert_eq!(text.plain_text(), "Ship it");
        assert_eq!(text.vertical, VAlign::Middle);
        let run = text.runs().next().unwrap();
        assert!(run.font.bold);
        assert_eq!(run.font.color, Some(Rgb::WHITE));
    }

    #[test]
    fn light_fill_gets_dark_text_and_alignment() {
        let canvas = render_tool(
            MainMessage,
            json!({"main_message": "x", "color": "#FFC107", "style": {"align": "center"}}),
            AREA,
        )
        .unwrap();
        let text = canvas.shapes[0].text.as_ref().unwrap();
        assert_eq!(text.align, HAlign::Center);
        assert_eq!(text.runs().next().unwrap().font.color, Some(Rgb::BLACK));
    }
}
