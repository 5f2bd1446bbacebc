use serde::Deserialize;

use crate::document::{Font, HAlign, Paragraph, Run, TextFrame, VAlign};
use crate::error::ToolResult;
use crate::layout::types::{EMU_PER_INCH, Rect, pt};
use crate::theme::Rgb;

use super::{RenderContext, Tool, text};

const TRACK: Rgb = Rgb::new(0xE9, 0xEC, 0xEF);
const MAX_TITLE_LINES: f64 = 4.0;

/// Title line above a rounded track with a proportional fill and a centered
/// percentage.
pub struct ProgressBar;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProgressBarData {
    pub title: String,
    /// Smaller tail appended to the title as ` - text`.
    pub text: Option<String>,
    pub current_pct: Option<f64>,
    pub numerator: Option<f64>,
    pub denominator: Option<f64>,
    pub target_pct: f64,
    pub title_pt: f64,
    pub suffix_pt: f64,
}

impl Default for ProgressBarData {
    fn default() -> Self {
        Self {
            title: String::new(),
            text: None,
            current_pct: None,
            numerator: None,
            denominator: None,
            target_pct: 100.0,
            title_pt: 18.0,
            suffix_pt: 12.0,
        }
    }
}

impl ProgressBarData {
    /// Explicit percentage, else numerator over denominator, else zero; clamped to `0..=100`.
    pub fn percent(&self) -> f64 {
        let raw = match (self.current_pct, self.numerator, self.denominator) {
            (Some(pct), _, _) => pct,
            (None, Some(num), Some(den)) if den != 0.0 => num / den * 100.0,
            _ => 0.0,
        };
        if raw.is_finite() { raw.clamp(0.0, 100.0) } else { 0.0 }
    }

    pub fn target(&self) -> f64 {
        self.target_pct.max(0.1)
    }

    fn suffix(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Rough line count of the title at `width` EMU.
    fn title_lines(&self, width: i64) -> f64 {
        let width_in = (width as f64 / EMU_PER_INCH as f64).max(0.01);
        let chars_per_line = (width_in * 144.0 / self.title_pt.max(8.0)).max(8.0);
        let mut len = self.title.chars().count() as f64;
        if let Some(suffix) = self.suffix() {
            let scale = if self.title_pt > 0.0 {
                self.suffix_pt / self.title_pt
            } else {
                0.6
            };
            len += 3.0 + (suffix.chars().count() as f64 * scale.clamp(0.4, 1.0)).floor();
        }
        (len / chars_per_line).ceil().clamp(1.0, MAX_TITLE_LINES)
    }
}

struct BarLayout {
    pad_x: i64,
    pad_y: i64,
    title_h: i64,
    bar: Rect,
}

fn bar_layout(data: &ProgressBarData, geom: Rect) -> BarLayout {
    let pad_x = ((geom.width as f64 * 0.05) as i64).max(pt(4.0));
    let pad_y = ((geom.height as f64 * 0.08) as i64).max(pt(4.0));
    let gap_y = ((geom.height as f64 * 0.06) as i64).max(pt(4.0));
    let min_bar_h = pt(8.0);

    let line_h = pt(data.title_pt * 1.3);
    let mut title_h = (pad_y + data.title_lines(geom.width) as i64 * line_h).min((geom.height as f64 * 0.6) as i64);
    let mut bar_h = geom.height - title_h - gap_y;
    if bar_h < min_bar_h {
        title_h = (geom.height - gap_y - min_bar_h).max(0);
        bar_h = min_bar_h;
    }
    BarLayout {
        pad_x,
        pad_y,
        title_h,
        bar: Rect::new(
            geom.left + pad_x,
            geom.top + title_h + gap_y,
            (geom.width - 2 * pad_x).max(0),
            bar_h,
        ),
    }
}

fn bar_color(ctx: &RenderContext<'_>, pct: f64, target: f64) -> Rgb {
    if pct >= target {
        ctx.theme_color("success", "#198754")
    } else if pct >= 70.0 {
        ctx.theme_color("primary", "#0D6EFD")
    } else if pct >= 40.0 {
        ctx.theme_color("warning", "#FFC107")
    } else {
        ctx.theme_color("danger", "#DC3545")
    }
}

impl Tool for ProgressBar {
    type Data = ProgressBarData;

    fn render(&self, data: &ProgressBarData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        let pct = data.percent();
        let target = data.target();
        let layout = bar_layout(data, geom);
        let text_color = ctx.text_color();

        if !data.title.is_empty() || data.suffix().is_some() {
            let title_font = Font::sized(data.title_pt as f32).colored(text_color);
            let mut runs = Vec::new();
            if !data.title.is_empty() {
                runs.push(Run {
                    text: data.title.clone(),
                    font: title_font.clone(),
                });
            }
            if let Some(suffix) = data.suffix() {
                runs.push(Run {
                    text: " - ".to_string(),
                    font: title_font,
                });
                runs.push(Run {
                    text: suffix.to_string(),
                    font: Font::sized(data.suffix_pt as f32).colored(text_color),
                });
            }
            let mut frame = TextFrame::empty();
            frame.paragraphs.push(Paragraph { runs, align: None });
            let area = Rect::new(
                geom.left + layout.pad_x,
                geom.top + layout.pad_y,
                (geom.width - 2 * layout.pad_x).max(0),
                (layout.title_h - layout.pad_y).max(0),
            );
            ctx.sink.add_textbox(area, frame).set_name("Progress Title");
        }

        let bar = layout.bar;
        ctx.sink
            .add_round_rect(bar, 0.5)
            .set_name("Progress Track")
            .set_fill(TRACK);

        let ratio = (pct / target).clamp(0.0, 1.0);
        let fill_w = (bar.width as f64 * ratio) as i64;
        let color = bar_color(ctx, pct, target);
        if fill_w > 0 {
            ctx.sink
                .add_rect(Rect::new(bar.left, bar.top, fill_w, bar.height))
                .set_name("Progress Fill")
                .set_fill(color);
        }

        let base = if ratio > 0.5 { color } else { TRACK };
        let font = Font::sized(12.0).bold(true).colored(base.contrast_text());
        ctx.sink
            .add_textbox(
                bar,
                text(&format!("{}%", pct.round()), font, HAlign::Center, VAlign::Middle).unwrapped(),
            )
            .set_name("Progress Label");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ShapeKind;
    use crate::tools::testing::{AREA, render_tool};
    use serde_json::json;

    fn data(value: serde_json::Value) -> ProgressBarData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn percent_prefers_explicit_then_ratio() {
        assert_eq!(data(json!({"current_pct": 42})).percent(), 42.0);
        assert_eq!(data(json!({"numerator": 3, "denominator": 4})).percent(), 75.0);
        assert_eq!(data(json!({"numerator": 3, "denominator": 0})).percent(), 0.0);
        assert_eq!(data(json!({"current_pct": 180})).percent(), 100.0);
        assert_eq!(data(json!({"target_pct": -5})).target(), 0.1);
    }

    #[test]
    fn fill_width_tracks_progress_against_target() {
        let canvas = render_tool(
            ProgressBar,
            json!({"title": "Migration", "text": "wave 2", "current_pct": 40, "target_pct": 80}),
            AREA,
        )
        .unwrap();
        let names: Vec<&str> = canvas.shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Progress Title", "Progress Track", "Progress Fill", "Progress Label"]
        );
        let track = &canvas.shapes[1];
        let fill = &canvas.shapes[2];
        assert!(matches!(track.kind, ShapeKind::RoundRect { .. }));
        assert_eq!(fill.frame.width, track.frame.width / 2);
        assert_eq!(fill.fill, Some(Rgb::new(0xFF, 0xC1, 0x07)));
        assert_eq!(canvas.shapes[3].text.as_ref().unwrap().plain_text(), "40%");
        assert_eq!(canvas.shapes[0].text.as_ref().unwrap().plain_text(), "Migration - wave 2");
    }

    #[test]
    fn zero_progress_has_no_fill_and_no_title() {
        let canvas = render_tool(ProgressBar, json!({}), AREA).unwrap();
        let names: Vec<&str> = canvas.shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Progress Track", "Progress Label"]);
    }

    #[test]
    fn short_areas_keep_a_minimum_bar() {
        let d = data(json!({"title": "A long title that wraps over several lines for sure", "title_pt": 40}));
        let layout = bar_layout(&d, Rect::new(0, 0, 2_000_000, pt(30.0)));
        assert_eq!(layout.bar.height, pt(8.0));
        assert!(layout.bar.bottom() <= pt(30.0));
    }
}
