use serde::Deserialize;

use crate::document::{Font, HAlign, Paragraph, Run, TextFrame, VAlign};
use crate::error::ToolResult;
use crate::layout::types::{Rect, pt};
use crate::theme::Rgb;

use super::{RenderContext, Tool};

const MIN_SUBTITLE_PT: f32 = 8.0;

/// Left-aligned title with an optional ` - subtitle` tail on the same line.
pub struct SlideTitle;

#[derive(Debug, Deserialize)]
pub struct SlideTitleData {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub style: Option<TitleStyle>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TitleStyle {
    pub title_pt: f32,
    pub subtitle_scale: f32,
    pub subtitle_pt: Option<f32>,
    pub color: Option<String>,
    pub divider: Option<Divider>,
}

impl Default for TitleStyle {
    fn default() -> Self {
        Self {
            title_pt: 32.0,
            subtitle_scale: 0.8,
            subtitle_pt: None,
            color: None,
            divider: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Divider {
    pub on: bool,
    pub color: String,
    /// Bar thickness in percent of the title box height.
    pub height_pct: f64,
    pub margin_top_pt: f64,
}

impl Default for Divider {
    fn default() -> Self {
        Self {
            on: false,
            color: "#E6E6E6".to_string(),
            height_pct: 1.2,
            margin_top_pt: 6.0,
        }
    }
}

impl TitleStyle {
    fn subtitle_size(&self) -> f32 {
        self.subtitle_pt
            .unwrap_or_else(|| (self.title_pt * self.subtitle_scale).round())
            .max(MIN_SUBTITLE_PT)
    }
}

impl Tool for SlideTitle {
    type Data = SlideTitleData;

    fn render(&self, data: &SlideTitleData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        let default_style = TitleStyle::default();
        let style = data.style.as_ref().unwrap_or(&default_style);

        // Explicit black defers to the theme text color.
        let color = match style.color.as_deref() {
            Some(c) if Rgb::parse(c) != Some(Rgb::BLACK) => ctx.color(Some(c), ctx.text_color()),
            _ => ctx.text_color(),
        };

        let title_font = Font::sized(style.title_pt).bold(true).colored(color);
        let mut runs = vec![Run {
            text: data.title.trim().to_string(),
            font: title_font,
        }];
        if let Some(subtitle) = data.subtitle.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let sub_font = Font::sized(style.subtitle_size()).colored(color);
            runs.push(Run {
                text: " - ".to_string(),
                font: sub_font.clone(),
            });
            runs.push(Run {
                text: subtitle.to_string(),
                font: sub_font,
            });
        }
        let mut frame = TextFrame::empty().aligned(HAlign::Left, VAlign::Top);
        frame.paragraphs.push(Paragraph { runs, align: None });
        ctx.sink.add_textbox(geom, frame).set_name("Title");

        if let Some(divider) = style.divider.as_ref().filter(|d| d.on) {
            let thickness = ((geom.height as f64 * divider.height_pct / 100.0) as i64).max(pt(1.0));
            let top = geom.bottom() + pt(divider.margin_top_pt);
            let fill = ctx.color(Some(&divider.color), Rgb::new(0xE6, 0xE6, 0xE6));
            ctx.sink
                .add_rect(Rect::new(geom.left, top, geom.width, thickness))
                .set_name("Title Divider")
                .set_fill(fill);
        }
        Ok(())
    }
}
