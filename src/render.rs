use crate::config::RenderConfig;
use crate::document::{
    Chart, ChartKind, Connector, Dash, DataLabels, Font, HAlign, Line, Shape, ShapeKind, SlideCanvas, Table,
    TextFrame, VAlign,
};
use crate::error::DeckError;
use crate::layout::types::{EMU_PER_INCH, Rect};
use crate::orchestrator::RenderedDeck;
use crate::text_metrics::{LINE_HEIGHT, measure_text_width, wrap_text};
use crate::theme::{Rgb, Theme};
use std::path::Path;

const DEFAULT_TABLE_BORDER: Rgb = Rgb::new(0xBF, 0xBF, 0xBF);
const CHART_AXIS: Rgb = Rgb::new(0x99, 0x99, 0x99);

/// One SVG document per slide, in slide order.
pub fn render_deck_svg(deck: &RenderedDeck, config: &RenderConfig) -> Vec<String> {
    deck.document
        .slides
        .iter()
        .map(|slide| render_slide_svg(slide, deck.document.width, deck.document.height, &deck.theme, config))
        .collect()
}

pub fn render_slide_svg(slide: &SlideCanvas, width: i64, height: i64, theme: &Theme, config: &RenderConfig) -> String {
    let mut svg = SvgWriter::new(theme, config);
    let w = svg.px(width);
    let h = svg.px(height);

    svg.out.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.2}\" height=\"{h:.2}\" viewBox=\"0 0 {w:.2} {h:.2}\">",
    ));
    svg.out.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        slide.background.to_hex()
    ));
    for shape in &slide.shapes {
        svg.shape(shape);
    }
    svg.out.push_str("</svg>");
    svg.out
}

struct SvgWriter<'a> {
    out: String,
    px_per_emu: f64,
    px_per_pt: f64,
    font_family: &'a str,
    text_color: Rgb,
}

struct TextLine<'f> {
    runs: Vec<(String, &'f Font)>,
    align: HAlign,
    size_pt: f32,
}

impl<'a> SvgWriter<'a> {
    fn new(theme: &'a Theme, config: &RenderConfig) -> Self {
        let ppi = if config.pixels_per_inch > 0.0 { config.pixels_per_inch } else { 96.0 };
        Self {
            out: String::new(),
            px_per_emu: ppi / EMU_PER_INCH as f64,
            px_per_pt: ppi / 72.0,
            font_family: theme.font_family.as_str(),
            text_color: theme.text_color(),
        }
    }

    fn px(&self, emu: i64) -> f64 {
        emu as f64 * self.px_per_emu
    }

    fn bounds(&self, rect: Rect) -> (f64, f64, f64, f64) {
        (
            self.px(rect.left),
            self.px(rect.top),
            self.px(rect.width.max(0)),
            self.px(rect.height.max(0)),
        )
    }

    fn paint(&self, fill: Option<Rgb>, line: Option<&Line>) -> String {
        let fill = fill.map(|c| c.to_hex()).unwrap_or_else(|| "none".to_string());
        match line {
            Some(line) => {
                let width = self.px(line.width).max(0.5);
                let mut attrs = format!(
                    "fill=\"{fill}\" stroke=\"{}\" stroke-width=\"{width:.2}\"",
                    line.color.to_hex()
                );
                match line.dash {
                    Dash::Solid => {}
                    Dash::Dash => attrs.push_str(&format!(" stroke-dasharray=\"{:.2} {:.2}\"", width * 4.0, width * 3.0)),
                    Dash::Dot => attrs.push_str(&format!(" stroke-dasharray=\"{width:.2} {:.2}\"", width * 2.0)),
                }
                attrs
            }
            None => format!("fill=\"{fill}\" stroke=\"none\""),
        }
    }

    fn shape(&mut self, shape: &Shape) {
        self.out.push_str(&format!(
            "<g id=\"shape-{}\" data-name=\"{}\">",
            shape.id,
            escape_xml(&shape.name)
        ));
        let (x, y, w, h) = self.bounds(shape.frame);
        let paint = self.paint(shape.fill, shape.line.as_ref());
        match &shape.kind {
            ShapeKind::Rect => {
                self.out.push_str(&format!(
                    "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" {paint}/>"
                ));
            }
            ShapeKind::RoundRect { radius } => {
                let r = radius * w.min(h);
                self.out.push_str(&format!(
                    "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"{r:.2}\" ry=\"{r:.2}\" {paint}/>"
                ));
            }
            ShapeKind::Oval => {
                self.out.push_str(&format!(
                    "<ellipse cx=\"{:.2}\" cy=\"{:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" {paint}/>",
                    x + w / 2.0,
                    y + h / 2.0,
                    w / 2.0,
                    h / 2.0
                ));
            }
            ShapeKind::Can => {
                let rx = w / 2.0;
                let ry = (h * 0.1).min(rx);
                self.out.push_str(&format!(
                    "<path d=\"M {x:.2} {:.2} L {x:.2} {:.2} A {rx:.2} {ry:.2} 0 0 0 {:.2} {:.2} L {:.2} {:.2} Z\" {paint}/>",
                    y + ry,
                    y + h - ry,
                    x + w,
                    y + h - ry,
                    x + w,
                    y + ry
                ));
                // Lid is a shade lighter than the body.
                let lid = self.paint(shape.fill.map(|c| c.tint(0.25)), shape.line.as_ref());
                self.out.push_str(&format!(
                    "<ellipse cx=\"{:.2}\" cy=\"{:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" {lid}/>",
                    x + rx,
                    y + ry
                ));
            }
            ShapeKind::TextBox => {
                if shape.fill.is_some() || shape.line.is_some() {
                    self.out.push_str(&format!(
                        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" {paint}/>"
                    ));
                }
            }
            ShapeKind::Connector(connector) => self.connector(shape, connector),
            ShapeKind::Table(table) => self.table(shape.frame, table),
            ShapeKind::Chart(chart) => self.chart(shape.frame, chart),
            ShapeKind::Group { children } => {
                for child in children {
                    self.shape(child);
                }
            }
        }
        if let Some(text) = &shape.text {
            self.text_frame(shape.frame, text);
        }
        self.out.push_str("</g>");
    }

    fn connector(&mut self, shape: &Shape, connector: &Connector) {
        if connector.points.len() < 2 {
            return;
        }
        let line = shape.line.unwrap_or(Line::solid(Rgb::BLACK, 9_525));
        let marker_id = format!("arrow-{}", shape.id);
        if connector.arrow_start || connector.arrow_end {
            self.out.push_str(&format!(
                "<defs><marker id=\"{marker_id}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker></defs>",
                line.color.to_hex()
            ));
        }
        let points: Vec<(f64, f64)> = connector
            .points
            .iter()
            .map(|(x, y)| (self.px(*x), self.px(*y)))
            .collect();
        let mut markers = String::new();
        if connector.arrow_start {
            markers.push_str(&format!(" marker-start=\"url(#{marker_id})\""));
        }
        if connector.arrow_end {
            markers.push_str(&format!(" marker-end=\"url(#{marker_id})\""));
        }
        self.out.push_str(&format!(
            "<path d=\"{}\" {}{markers}/>",
            points_to_path(&points),
            self.paint(None, Some(&line))
        ));
    }

    fn table(&mut self, frame: Rect, table: &Table) {
        let border = table.border.unwrap_or(Line::solid(DEFAULT_TABLE_BORDER, 6_350));
        let mut top = frame.top;
        for (r, row) in table.cells.iter().enumerate() {
            let height = table.row_heights.get(r).copied().unwrap_or(0);
            let mut left = frame.left;
            for (c, cell) in row.iter().enumerate() {
                let width = table.col_widths.get(c).copied().unwrap_or(0);
                let rect = Rect::new(left, top, width, height);
                let (x, y, w, h) = self.bounds(rect);
                self.out.push_str(&format!(
                    "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" {}/>",
                    self.paint(cell.fill, Some(&border))
                ));
                self.text_frame(rect, &cell.text);
                left += width;
            }
            top += height;
        }
    }

    fn chart(&mut self, frame: Rect, chart: &Chart) {
        let (x, mut y, mut w, mut h) = self.bounds(frame);
        let font_px = chart.font.size_pt as f64 * self.px_per_pt;
        let color = chart.font.color.unwrap_or(self.text_color);

        if let Some(title) = &chart.title {
            self.label(x + w / 2.0, y + font_px * 1.2, title, font_px * 1.2, color, "middle", true);
            y += font_px * 1.8;
            h -= font_px * 1.8;
        }
        match chart.kind {
            ChartKind::ClusteredBar => {
                if chart.show_legend {
                    let names: Vec<(&str, Rgb)> = chart
                        .series
                        .iter()
                        .map(|s| (s.name.as_str(), s.colors.first().copied().unwrap_or(Rgb::BLACK)))
                        .collect();
                    self.legend_row(x, y + h - font_px * 1.4, w, &names, font_px, color);
                    h -= font_px * 2.0;
                }
                self.bars(x, y, w, h.max(0.0), chart, font_px, color);
            }
            ChartKind::Pie => {
                if chart.show_legend {
                    let legend_w = w * 0.3;
                    let colors = chart.series.first().map(|s| s.colors.as_slice()).unwrap_or(&[]);
                    let mut ly = y + h / 2.0 - chart.categories.len() as f64 * font_px * 0.75;
                    for (idx, name) in chart.categories.iter().enumerate() {
                        let swatch = colors.get(idx).copied().unwrap_or(Rgb::BLACK);
                        self.swatch(x + w - legend_w, ly, font_px, swatch);
                        self.label(x + w - legend_w + font_px * 1.4, ly + font_px * 0.85, name, font_px, color, "start", false);
                        ly += font_px * 1.5;
                    }
                    w -= legend_w;
                }
                self.pie(x, y, w, h.max(0.0), chart, font_px, color);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn bars(&mut self, x: f64, y: f64, w: f64, h: f64, chart: &Chart, font_px: f64, color: Rgb) {
        let band = font_px * 1.6;
        let plot_h = (h - band).max(0.0);
        let values = chart.series.iter().flat_map(|s| s.values.iter().copied());
        let (min, max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let span = if max - min > 0.0 { max - min } else { 1.0 };
        let zero_y = y + plot_h * (max / span);

        let n = chart.categories.len().max(1) as f64;
        let slot = w / n;
        let bar_w = slot * 0.8 / chart.series.len().max(1) as f64;
        for (s, series) in chart.series.iter().enumerate() {
            let fill = series.colors.first().copied().unwrap_or(Rgb::BLACK).to_hex();
            for (i, value) in series.values.iter().enumerate() {
                let bx = x + i as f64 * slot + slot * 0.1 + s as f64 * bar_w;
                let bh = value.abs() / span * plot_h;
                let by = if *value >= 0.0 { zero_y - bh } else { zero_y };
                self.out.push_str(&format!(
                    "<rect x=\"{bx:.2}\" y=\"{by:.2}\" width=\"{bar_w:.2}\" height=\"{bh:.2}\" fill=\"{fill}\"/>"
                ));
                if chart.data_labels != DataLabels::None {
                    let ly = if *value >= 0.0 { by - font_px * 0.3 } else { by + bh + font_px };
                    self.label(bx + bar_w / 2.0, ly, &format_number(*value), font_px * 0.9, color, "middle", false);
                }
            }
        }
        self.out.push_str(&format!(
            "<path d=\"M {x:.2} {zero_y:.2} L {:.2} {zero_y:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
            x + w,
            CHART_AXIS.to_hex()
        ));
        for (i, category) in chart.categories.iter().enumerate() {
            let cx = x + (i as f64 + 0.5) * slot;
            self.label(cx, y + plot_h + font_px * 1.3, category, font_px, color, "middle", false);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn pie(&mut self, x: f64, y: f64, w: f64, h: f64, chart: &Chart, font_px: f64, color: Rgb) {
        let Some(series) = chart.series.first() else {
            return;
        };
        let total: f64 = series.values.iter().filter(|v| **v > 0.0).sum();
        if total <= 0.0 {
            return;
        }
        let (cx, cy) = (x + w / 2.0, y + h / 2.0);
        let r = w.min(h) / 2.0 * 0.9;
        let mut angle = -std::f64::consts::FRAC_PI_2;
        for (idx, value) in series.values.iter().enumerate() {
            if *value <= 0.0 {
                continue;
            }
            let frac = value / total;
            let sweep = frac * std::f64::consts::TAU;
            let fill = series.colors.get(idx).copied().unwrap_or(Rgb::BLACK).to_hex();
            if frac >= 0.9999 {
                self.out.push_str(&format!(
                    "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{fill}\"/>"
                ));
            } else {
                let (x0, y0) = (cx + r * angle.cos(), cy + r * angle.sin());
                let end = angle + sweep;
                let (x1, y1) = (cx + r * end.cos(), cy + r * end.sin());
                let large = if sweep > std::f64::consts::PI { 1 } else { 0 };
                self.out.push_str(&format!(
                    "<path d=\"M {cx:.2} {cy:.2} L {x0:.2} {y0:.2} A {r:.2} {r:.2} 0 {large} 1 {x1:.2} {y1:.2} Z\" fill=\"{fill}\" stroke=\"#FFFFFF\" stroke-width=\"1\"/>"
                ));
            }
            let label = match chart.data_labels {
                DataLabels::None => None,
                DataLabels::Value => Some(format_number(*value)),
                DataLabels::Percent => Some(format!("{:.0}%", frac * 100.0)),
            };
            if let Some(label) = label {
                let mid = angle + sweep / 2.0;
                let (lx, ly) = (cx + r * 0.65 * mid.cos(), cy + r * 0.65 * mid.sin() + font_px * 0.35);
                self.label(lx, ly, &label, font_px, color, "middle", false);
            }
            angle += sweep;
        }
    }

    fn legend_row(&mut self, x: f64, y: f64, w: f64, entries: &[(&str, Rgb)], font_px: f64, color: Rgb) {
        let widths: Vec<f64> = entries
            .iter()
            .map(|(name, _)| {
                measure_text_width(name, (font_px / self.px_per_pt) as f32, self.font_family) as f64 * self.px_per_pt
                    + font_px * 2.4
            })
            .collect();
        let total: f64 = widths.iter().sum();
        let mut cursor = x + ((w - total) / 2.0).max(0.0);
        for ((name, swatch), width) in entries.iter().zip(widths) {
            self.swatch(cursor, y, font_px, *swatch);
            self.label(cursor + font_px * 1.4, y + font_px * 0.85, name, font_px, color, "start", false);
            cursor += width;
        }
    }

    fn swatch(&mut self, x: f64, y: f64, size: f64, color: Rgb) {
        self.out.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{size:.2}\" height=\"{size:.2}\" fill=\"{}\"/>",
            color.to_hex()
        ));
    }

    #[allow(clippy::too_many_arguments)]
    fn label(&mut self, x: f64, y: f64, text: &str, size_px: f64, color: Rgb, anchor: &str, bold: bool) {
        let weight = if bold { " font-weight=\"bold\"" } else { "" };
        self.out.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{size_px:.2}\" fill=\"{}\"{weight}>{}</text>",
            escape_xml(self.font_family),
            color.to_hex(),
            escape_xml(text)
        ));
    }

    fn text_frame(&mut self, frame: Rect, text: &TextFrame) {
        let inner = Rect::new(
            frame.left + text.inset_x,
            frame.top + text.inset_y,
            (frame.width - 2 * text.inset_x).max(0),
            (frame.height - 2 * text.inset_y).max(0),
        );
        let (x, y, w, h) = self.bounds(inner);
        let max_pt = (w / self.px_per_pt) as f32;

        let mut lines: Vec<TextLine<'_>> = Vec::new();
        for paragraph in &text.paragraphs {
            let align = paragraph.align.unwrap_or(text.align);
            let Some(first) = paragraph.runs.first() else {
                continue;
            };
            let size_pt = first.font.size_pt;
            let plain = paragraph.text();
            if !text.wrap || measure_text_width(&plain, size_pt, self.font_family) <= max_pt {
                lines.push(TextLine {
                    runs: paragraph.runs.iter().map(|r| (r.text.clone(), &r.font)).collect(),
                    align,
                    size_pt,
                });
            } else {
                for line in wrap_text(&plain, size_pt, self.font_family, max_pt) {
                    lines.push(TextLine {
                        runs: vec![(line, &first.font)],
                        align,
                        size_pt,
                    });
                }
            }
        }
        if lines.is_empty() {
            return;
        }

        let px_per_pt = self.px_per_pt;
        let line_px = |size_pt: f32| size_pt as f64 * px_per_pt * LINE_HEIGHT as f64;
        let total: f64 = lines.iter().map(|l| line_px(l.size_pt)).sum();
        let mut cursor = match text.vertical {
            VAlign::Top => y,
            VAlign::Middle => y + (h - total) / 2.0,
            VAlign::Bottom => y + h - total,
        };
        for line in &lines {
            let size_px = line.size_pt as f64 * self.px_per_pt;
            let baseline = cursor + size_px;
            let (tx, anchor) = match line.align {
                HAlign::Left => (x, "start"),
                HAlign::Center => (x + w / 2.0, "middle"),
                HAlign::Right => (x + w, "end"),
            };
            self.out.push_str(&format!(
                "<text x=\"{tx:.2}\" y=\"{baseline:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{size_px:.2}\" xml:space=\"preserve\">",
                escape_xml(self.font_family)
            ));
            for (content, font) in &line.runs {
                self.out.push_str(&format!(
                    "<tspan font-size=\"{:.2}\" fill=\"{}\"{}>{}</tspan>",
                    font.size_pt as f64 * self.px_per_pt,
                    font.color.unwrap_or(self.text_color).to_hex(),
                    font_attrs(font),
                    escape_xml(content)
                ));
            }
            self.out.push_str("</text>");
            cursor += line_px(line.size_pt);
        }
    }
}

fn font_attrs(font: &Font) -> String {
    let mut attrs = String::new();
    if font.bold {
        attrs.push_str(" font-weight=\"bold\"");
    }
    if font.italic {
        attrs.push_str(" font-style=\"italic\"");
    }
    if font.underline {
        attrs.push_str(" text-decoration=\"underline\"");
    }
    attrs
}

fn points_to_path(points: &[(f64, f64)]) -> String {
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.0, first.1);
    for point in rest {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

/// `3` → `"3"`, `2.5` → `"2.5"`, `1.239` → `"1.24"`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn write_output_svg(svg: &str, output: &Path) -> Result<(), DeckError> {
    std::fs::write(output, svg).map_err(|source| DeckError::Io {
        path: output.to_path_buf(),
        source,
    })
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, config: &RenderConfig, theme: &Theme) -> Result<(), DeckError> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(str::trim)
        .filter(|family| !family.is_empty())
        .unwrap_or("Inter")
        .to_string();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|err| DeckError::Output(format!("invalid SVG: {err}")))?;
    let scale = if config.png_scale > 0.0 { config.png_scale } else { 1.0 };
    let size = tree.size();
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width.max(1), height.max(1))
        .ok_or_else(|| DeckError::Output(format!("failed to allocate a {width}x{height} pixmap")))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::from_scale(scale, scale), &mut pixmap_mut);
    pixmap
        .save_png(output)
        .map_err(|err| DeckError::Output(format!("failed to write {}: {err}", output.display())))
}
