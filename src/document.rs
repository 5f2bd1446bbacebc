//! In-memory slide document: absolute shapes with fill, line and text properties.
//!
//! Coordinates are EMU. Group children keep absolute coordinates, so a group frame
//! is just the box the members were laid out in.

use serde::{Deserialize, Serialize};

use crate::layout::routing::{ConnectorRoute, RouteStyle, Site, polyline};
use crate::layout::types::Rect;
use crate::theme::Rgb;

pub type ShapeId = u32;

/// Id 1 is reserved for the slide itself.
const FIRST_SHAPE_ID: ShapeId = 2;

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub width: i64,
    pub height: i64,
    pub slides: Vec<SlideCanvas>,
}

impl Document {
    pub fn new(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            slides: Vec::new(),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn add_slide(&mut self, background: Rgb) -> &mut SlideCanvas {
        let index = self.slides.len();
        self.slides.push(SlideCanvas::new(index, background));
        let last = self.slides.len() - 1;
        &mut self.slides[last]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideCanvas {
    pub index: usize,
    pub background: Rgb,
    pub shapes: Vec<Shape>,
    #[serde(skip)]
    next_id: ShapeId,
}

impl SlideCanvas {
    pub fn new(index: usize, background: Rgb) -> Self {
        Self {
            index,
            background,
            shapes: Vec::new(),
            next_id: FIRST_SHAPE_ID,
        }
    }

    /// Sink drawing onto the slide's top level.
    pub fn sink(&mut self) -> ShapeSink<'_> {
        ShapeSink {
            shapes: &mut self.shapes,
            next_id: &mut self.next_id,
        }
    }

    pub fn top_level_ids(&self) -> Vec<ShapeId> {
        self.shapes.iter().map(|s| s.id).collect()
    }

    /// Drops every top-level shape added after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.shapes.truncate(len);
    }

    pub fn find(&self, id: ShapeId) -> Option<&Shape> {
        find_in(&self.shapes, id)
    }

    /// Every shape in paint order, descending into groups.
    pub fn walk(&self) -> Vec<&Shape> {
        let mut out = Vec::new();
        walk_into(&self.shapes, &mut out);
        out
    }
}

fn find_in(shapes: &[Shape], id: ShapeId) -> Option<&Shape> {
    for shape in shapes {
        if shape.id == id {
            return Some(shape);
        }
        if let ShapeKind::Group { children } = &shape.kind
            && let Some(found) = find_in(children, id)
        {
            return Some(found);
        }
    }
    None
}

fn walk_into<'a>(shapes: &'a [Shape], out: &mut Vec<&'a Shape>) {
    for shape in shapes {
        out.push(shape);
        if let ShapeKind::Group { children } = &shape.kind {
            walk_into(children, out);
        }
    }
}

/// Append-only drawing target: a slide's top level or the member list of a group.
pub struct ShapeSink<'a> {
    shapes: &'a mut Vec<Shape>,
    next_id: &'a mut ShapeId,
}

impl<'a> ShapeSink<'a> {
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shapes(&self) -> &[Shape] {
        self.shapes.as_slice()
    }

    /// Reborrows the sink for a shorter scope.
    pub fn reborrow(&mut self) -> ShapeSink<'_> {
        ShapeSink {
            shapes: &mut *self.shapes,
            next_id: &mut *self.next_id,
        }
    }

    pub fn add_shape(&mut self, kind: ShapeKind, frame: Rect) -> &mut Shape {
        let id = *self.next_id;
        *self.next_id += 1;
        let name = format!("{} {}", kind.label(), id);
        self.shapes.push(Shape {
            id,
            name,
            frame,
            kind,
            fill: None,
            line: None,
            text: None,
        });
        let last = self.shapes.len() - 1;
        &mut self.shapes[last]
    }

    pub fn add_rect(&mut self, frame: Rect) -> &mut Shape {
        self.add_shape(ShapeKind::Rect, frame)
    }

    /// `radius` is the corner radius as a fraction of the shorter side, `0..=0.5`.
    pub fn add_round_rect(&mut self, frame: Rect, radius: f64) -> &mut Shape {
        self.add_shape(
            ShapeKind::RoundRect {
                radius: radius.clamp(0.0, 0.5),
            },
            frame,
        )
    }

    pub fn add_oval(&mut self, frame: Rect) -> &mut Shape {
        self.add_shape(ShapeKind::Oval, frame)
    }

    pub fn add_textbox(&mut self, frame: Rect, text: TextFrame) -> &mut Shape {
        let shape = self.add_shape(ShapeKind::TextBox, frame);
        shape.text = Some(text);
        shape
    }

    /// Straight or elbow connector; endpoints are truncated to whole EMU.
    pub fn add_connector(
        &mut self,
        route: &ConnectorRoute,
        begin: Option<ShapeId>,
        end: Option<ShapeId>,
    ) -> &mut Shape {
        let points = polyline(route)
            .into_iter()
            .map(|p| (p.x as i64, p.y as i64))
            .collect();
        self.add_shape(
            ShapeKind::Connector(Connector {
                style: route.style,
                points,
                begin: begin.map(|id| (id, route.begin_site)),
                end: end.map(|id| (id, route.end_site)),
                arrow_start: false,
                arrow_end: true,
            }),
            route.frame(),
        )
    }

    pub fn add_table(&mut self, frame: Rect, table: Table) -> &mut Shape {
        self.add_shape(ShapeKind::Table(table), frame)
    }

    pub fn add_chart(&mut self, frame: Rect, chart: Chart) -> &mut Shape {
        self.add_shape(ShapeKind::Chart(chart), frame)
    }

    /// Adds an empty group and returns its id with a sink over its members.
    pub fn add_group(&mut self, frame: Rect) -> (ShapeId, ShapeSink<'_>) {
        let id = self
            .add_shape(
                ShapeKind::Group {
                    children: Vec::new(),
                },
                frame,
            )
            .id;
        let last = self.shapes.len() - 1;
        let children = match &mut self.shapes[last].kind {
            ShapeKind::Group { children } => children,
            _ => unreachable!("add_shape stores the kind it was given"),
        };
        (
            id,
            ShapeSink {
                shapes: children,
                next_id: &mut *self.next_id,
            },
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Shape {
    pub id: ShapeId,
    pub name: String,
    pub frame: Rect,
    pub kind: ShapeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextFrame>,
}

impl Shape {
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn set_fill(&mut self, color: Rgb) -> &mut Self {
        self.fill = Some(color);
        self
    }

    pub fn set_line(&mut self, line: Line) -> &mut Self {
        self.line = Some(line);
        self
    }

    pub fn set_text(&mut self, text: TextFrame) -> &mut Self {
        self.text = Some(text);
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ShapeKind::Group { .. })
    }

    /// Direct member ids of a group; empty for anything else.
    pub fn member_ids(&self) -> Vec<ShapeId> {
        match &self.kind {
            ShapeKind::Group { children } => children.iter().map(|c| c.id).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeKind {
    Rect,
    RoundRect { radius: f64 },
    Oval,
    /// Cylinder, used for data stores.
    Can,
    TextBox,
    Connector(Connector),
    Table(Table),
    Chart(Chart),
    Group { children: Vec<Shape> },
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "Rectangle",
            ShapeKind::RoundRect { .. } => "Rounded Rectangle",
            ShapeKind::Oval => "Oval",
            ShapeKind::Can => "Can",
            ShapeKind::TextBox => "TextBox",
            ShapeKind::Connector(_) => "Connector",
            ShapeKind::Table(_) => "Table",
            ShapeKind::Chart(_) => "Chart",
            ShapeKind::Group { .. } => "Group",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Connector {
    pub style: RouteStyle,
    pub points: Vec<(i64, i64)>,
    /// Glued shape and site at the start.
    pub begin: Option<(ShapeId, Site)>,
    pub end: Option<(ShapeId, Site)>,
    pub arrow_start: bool,
    pub arrow_end: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dash {
    #[default]
    Solid,
    Dash,
    Dot,
}

impl Dash {
    pub fn parse(value: &str) -> Dash {
        match value.trim().to_ascii_lowercase().as_str() {
            "dash" | "dashed" => Dash::Dash,
            "dot" | "dotted" | "round_dot" => Dash::Dot,
            _ => Dash::Solid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Line {
    pub color: Rgb,
    /// Stroke width in EMU.
    pub width: i64,
    pub dash: Dash,
}

impl Line {
    pub fn solid(color: Rgb, width: i64) -> Self {
        Self {
            color,
            width,
            dash: Dash::Solid,
        }
    }

    pub fn dashed(mut self, dash: Dash) -> Self {
        self.dash = dash;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl HAlign {
    pub fn parse(value: &str) -> Option<HAlign> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Some(HAlign::Left),
            "center" | "centre" | "middle" | "c" => Some(HAlign::Center),
            "right" | "r" => Some(HAlign::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl VAlign {
    pub fn parse(value: &str) -> Option<VAlign> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Some(VAlign::Top),
            "middle" | "center" | "centre" => Some(VAlign::Middle),
            "bottom" => Some(VAlign::Bottom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub size_pt: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

impl Font {
    pub fn sized(size_pt: f32) -> Self {
        Self {
            size_pt,
            bold: false,
            italic: false,
            underline: false,
            color: None,
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    pub fn colored(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub text: String,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<HAlign>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Default left/right text inset, 0.1in.
pub const DEFAULT_INSET_X: i64 = 91_440;
/// Default top/bottom text inset, 0.05in.
pub const DEFAULT_INSET_Y: i64 = 45_720;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
    pub align: HAlign,
    pub vertical: VAlign,
    pub wrap: bool,
    /// Left/right inset in EMU.
    pub inset_x: i64,
    /// Top/bottom inset in EMU.
    pub inset_y: i64,
}

impl TextFrame {
    /// One paragraph per line of `text`, all sharing `font`.
    pub fn plain(text: &str, font: Font) -> Self {
        let paragraphs = text
            .split('\n')
            .map(|line| Paragraph {
                runs: vec![Run {
                    text: line.to_string(),
                    font: font.clone(),
                }],
                align: None,
            })
            .collect();
        Self {
            paragraphs,
            align: HAlign::Left,
            vertical: VAlign::Top,
            wrap: true,
            inset_x: DEFAULT_INSET_X,
            inset_y: DEFAULT_INSET_Y,
        }
    }

    pub fn empty() -> Self {
        Self {
            paragraphs: Vec::new(),
            align: HAlign::Left,
            vertical: VAlign::Top,
            wrap: true,
            inset_x: DEFAULT_INSET_X,
            inset_y: DEFAULT_INSET_Y,
        }
    }

    pub fn aligned(mut self, align: HAlign, vertical: VAlign) -> Self {
        self.align = align;
        self.vertical = vertical;
        self
    }

    pub fn with_inset(mut self, x: i64, y: i64) -> Self {
        self.inset_x = x.max(0);
        self.inset_y = y.max(0);
        self
    }

    pub fn unwrapped(mut self) -> Self {
        self.wrap = false;
        self
    }

    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.paragraphs.iter_mut().flat_map(|p| p.runs.iter_mut())
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.paragraphs.iter().flat_map(|p| p.runs.iter())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableCell {
    pub text: TextFrame,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Rgb>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub col_widths: Vec<i64>,
    pub row_heights: Vec<i64>,
    /// Row-major, `row_heights.len()` rows of `col_widths.len()` cells.
    pub cells: Vec<Vec<TableCell>>,
    pub border: Option<Line>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    ClusteredBar,
    Pie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLabels {
    #[default]
    None,
    Value,
    Percent,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
    /// One color per series for bars, one per point for pies.
    pub colors: Vec<Rgb>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
    pub show_legend: bool,
    pub data_labels: DataLabels,
    /// Font shared by title, axis, legend and label text.
    pub font: Font,
}

/// Overrides the color of every text run under `shapes`: nested groups, table
/// cells and chart text included.
pub fn force_text_color(shapes: &mut [Shape], color: Rgb) {
    for shape in shapes {
        if let Some(text) = shape.text.as_mut() {
            for run in text.runs_mut() {
                run.font.color = Some(color);
            }
        }
        match &mut shape.kind {
            ShapeKind::Group { children } => force_text_color(children, color),
            ShapeKind::Table(table) => {
                for cell in table.cells.iter_mut().flatten() {
                    for run in cell.text.runs_mut() {
                        run.font.color = Some(color);
                    }
                }
            }
            ShapeKind::Chart(chart) => chart.font.color = Some(color),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingConfig;
    use crate::layout::routing::route;

    const RED: Rgb = Rgb::new(255, 0, 0);

    #[test]
    fn ids_are_unique_across_groups() {
        let mut slide = SlideCanvas::new(0, Rgb::WHITE);
        let mut sink = slide.sink();
        let a = sink.add_rect(Rect::new(0, 0, 10, 10)).id;
        let (group, mut members) = sink.add_group(Rect::new(0, 0, 100, 100));
        let b = members.add_oval(Rect::new(5, 5, 10, 10)).id;
        let c = sink.add_rect(Rect::new(0, 0, 1, 1)).id;
        assert_eq!(a, FIRST_SHAPE_ID);
        assert_eq!(vec![a, group, b, c], vec![2, 3, 4, 5]);
        assert_eq!(slide.top_level_ids(), vec![a, group, c]);
        assert_eq!(slide.find(b).map(|s| s.frame), Some(Rect::new(5, 5, 10, 10)));
        assert_eq!(slide.find(group).map(Shape::member_ids), Some(vec![b]));
    }

    #[test]
    fn truncate_rolls_back_top_level_shapes() {
        let mut slide = SlideCanvas::new(0, Rgb::WHITE);
        slide.sink().add_rect(Rect::default());
        let before = slide.shapes.len();
        slide.sink().add_rect(Rect::default());
        slide.sink().add_rect(Rect::default());
        slide.truncate(before);
        assert_eq!(slide.shapes.len(), 1);
    }

    #[test]
    fn force_text_color_reaches_nested_text() {
        let mut slide = SlideCanvas::new(0, Rgb::WHITE);
        {
            let mut sink = slide.sink();
            let (_, mut members) = sink.add_group(Rect::default());
            members.add_textbox(Rect::default(), TextFrame::plain("a\nb", Font::sized(12.0)));
            let (_, mut nested) = members.add_group(Rect::default());
            nested.add_table(
                Rect::default(),
                Table {
                    col_widths: vec![1],
                    row_heights: vec![1],
                    cells: vec![vec![TableCell {
                        text: TextFrame::plain("cell", Font::sized(10.0).colored(Rgb::WHITE)),
                        fill: None,
                    }]],
                    border: None,
                },
            );
            nested.add_chart(
                Rect::default(),
                Chart {
                    kind: ChartKind::Pie,
                    title: None,
                    categories: vec![],
                    series: vec![],
                    show_legend: false,
                    data_labels: DataLabels::None,
                    font: Font::sized(10.0),
                },
            );
        }
        force_text_color(&mut slide.shapes, RED);

        let mut seen = 0;
        for shape in slide.walk() {
            if let Some(text) = &shape.text {
                assert!(text.runs().all(|r| r.font.color == Some(RED)));
                seen += 1;
            }
            match &shape.kind {
                ShapeKind::Table(t) => {
                    assert_eq!(t.cells[0][0].text.runs().next().and_then(|r| r.font.color), Some(RED));
                    seen += 1;
                }
                ShapeKind::Chart(c) => {
                    assert_eq!(c.font.color, Some(RED));
                    seen += 1;
                }
                _ => {}
            }
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn connector_points_are_truncated() {
        let r = route(
            &Rect::new(0, 0, 101, 101),
            &Rect::new(301, 0, 101, 101),
            0,
            &RoutingConfig::default(),
        );
        let mut slide = SlideCanvas::new(0, Rgb::WHITE);
        let shape = slide.sink().add_connector(&r, Some(7), None).clone();
        let ShapeKind::Connector(conn) = shape.kind else {
            panic!("expected connector");
        };
        assert_eq!(conn.points, vec![(101, 50), (301, 50)]);
        assert_eq!(conn.begin, Some((7, Site::Right)));
        assert_eq!(conn.end, None);
    }

    #[test]
    fn plain_text_splits_paragraphs() {
        let frame = TextFrame::plain("one\ntwo", Font::sized(12.0));
        assert_eq!(frame.paragraphs.len(), 2);
        assert_eq!(frame.plain_text(), "one\ntwo");
    }
}
