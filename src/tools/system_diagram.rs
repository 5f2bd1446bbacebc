use serde::Deserialize;
use std::collections::HashMap;

use crate::document::{Dash, Font, HAlign, Line, ShapeId, ShapeKind, VAlign};
use crate::error::ToolResult;
use crate::layout::routing::{ConnectorRoute, RouteStyle, Site};
use crate::layout::types::{Rect, pt};
use crate::theme::Rgb;

use super::{RenderContext, Tool, centered, text};

/// Share of a grid cell a node occupies on each axis.
const NODE_SCALE: f64 = 0.7;
const BOUNDARY_PAD_PT: f64 = 20.0;

const NODE_FILL: Rgb = Rgb::new(230, 240, 255);
const NODE_LINE: Rgb = Rgb::new(100, 120, 150);

/// Nodes snapped to a row/column grid, dashed boundaries around node groups
/// and straight connectors between facing edges.
pub struct SystemDiagram;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SystemDiagramData {
    pub title: Option<String>,
    pub grid: Grid,
    pub nodes: Vec<SystemNode>,
    pub connectors: Vec<SystemConnector>,
    pub boundaries: Vec<Boundary>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Grid {
    pub rows: u32,
    pub cols: u32,
}

impl Default for Grid {
    fn default() -> Self {
        Self { rows: 3, cols: 5 }
    }
}

#[derive(Debug, Deserialize)]
pub struct SystemNode {
    pub id: String,
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
    pub label: String,
    pub pos: GridPos,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GridPos {
    pub row: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowHead {
    Start,
    End,
    Both,
    #[default]
    None,
}

#[derive(Debug, Deserialize)]
pub struct SystemConnector {
    #[serde(alias = "from_")]
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub arrow_head: Option<ArrowHead>,
}

#[derive(Debug, Deserialize)]
pub struct Boundary {
    pub label: String,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

fn node_frame(area: Rect, grid: Grid, pos: GridPos) -> Rect {
    let cell_w = area.width as f64 / grid.cols.max(1) as f64;
    let cell_h = area.height as f64 / grid.rows.max(1) as f64;
    let w = (cell_w * NODE_SCALE) as i64;
    let h = (cell_h * NODE_SCALE) as i64;
    Rect::new(
        area.left + (pos.col as f64 * cell_w + (cell_w - w as f64) / 2.0) as i64,
        area.top + (pos.row as f64 * cell_h + (cell_h - h as f64) / 2.0) as i64,
        w,
        h,
    )
}

/// Edge-to-edge straight route along whichever axis separates the centers more.
fn facing_edges(from: &Rect, to: &Rect) -> ConnectorRoute {
    let f = from.center();
    let t = to.center();
    let (begin_site, end_site) = if (t.x - f.x).abs() > (t.y - f.y).abs() {
        if f.x < t.x {
            (Site::Right, Site::Left)
        } else {
            (Site::Left, Site::Right)
        }
    } else if f.y < t.y {
        (Site::Bottom, Site::Top)
    } else {
        (Site::Top, Site::Bottom)
    };
    ConnectorRoute {
        start: begin_site.point_on(from),
        end: end_site.point_on(to),
        begin_site,
        end_site,
        style: RouteStyle::Straight,
    }
}

impl Tool for SystemDiagram {
    type Data = SystemDiagramData;

    fn render(&self, data: &SystemDiagramData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        let text_color = ctx.text_color();
        let frames: HashMap<&str, Rect> = data
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), node_frame(geom, data.grid, node.pos)))
            .collect();

        // Boundaries go underneath the nodes.
        let pad = pt(BOUNDARY_PAD_PT);
        for boundary in &data.boundaries {
            let members = boundary.nodes.iter().filter_map(|id| frames.get(id.as_str()));
            let Some(bbox) = Rect::bounding(members) else {
                continue;
            };
            let frame = bbox.outset(pad, pad);
            let dash = boundary.style.as_deref().map(Dash::parse).unwrap_or_default();
            let color = ctx.color(boundary.color.as_deref(), NODE_LINE);
            ctx.sink
                .add_round_rect(frame, 0.05)
                .set_name(format!("Boundary {}", boundary.label))
                .set_line(Line::solid(color, pt(1.5)).dashed(dash));
            let font = Font::sized(11.0).italic(true).colored(text_color);
            ctx.sink.add_textbox(
                Rect::new(frame.left + pt(5.0), frame.top - pt(15.0), pt(200.0), pt(20.0)),
                text(&boundary.label, font, HAlign::Left, VAlign::Top),
            );
        }

        let mut ids: HashMap<&str, ShapeId> = HashMap::new();
        for node in &data.nodes {
            let frame = frames[node.id.as_str()];
            let font = Font::sized(10.0).colored(text_color);
            let shape = match node.node_type.as_deref().unwrap_or("default") {
                "user" => ctx.sink.add_oval(frame),
                "system" => ctx.sink.add_round_rect(frame, 0.1),
                "database" => ctx.sink.add_shape(ShapeKind::Can, frame),
                _ => ctx.sink.add_rect(frame),
            };
            shape
                .set_name(node.id.clone())
                .set_fill(NODE_FILL)
                .set_line(Line::solid(NODE_LINE, pt(1.0)))
                .set_text(text(&node.label, font, HAlign::Center, VAlign::Middle));
            ids.insert(node.id.as_str(), shape.id);
        }

        for conn in &data.connectors {
            let (Some(from), Some(to)) = (frames.get(conn.from.as_str()), frames.get(conn.to.as_str())) else {
                tracing::debug!(from = %conn.from, to = %conn.to, "skipping connector to an unknown node");
                continue;
            };
            let path = facing_edges(from, to);
            let arrow = conn.arrow_head.unwrap_or_default();
            let dash = conn.style.as_deref().map(Dash::parse).unwrap_or_default();
            let line = Line::solid(NODE_LINE, pt(1.0)).dashed(dash);
            let shape = ctx.sink.add_connector(
                &path,
                ids.get(conn.from.as_str()).copied(),
                ids.get(conn.to.as_str()).copied(),
            );
            shape.set_line(line);
            if let ShapeKind::Connector(c) = &mut shape.kind {
                c.arrow_start = matches!(arrow, ArrowHead::Start | ArrowHead::Both);
                c.arrow_end = matches!(arrow, ArrowHead::End | ArrowHead::Both);
            }

            if let Some(label) = conn.label.as_deref().filter(|l| !l.trim().is_empty()) {
                let mid = path.start.midpoint(path.end);
                let font = Font::sized(9.0).colored(text_color);
                ctx.sink.add_textbox(
                    centered(mid.x, mid.y, pt(80.0), pt(40.0)),
                    text(label, font, HAlign::Center, VAlign::Middle),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{AREA, render_tool};
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "grid": {"rows": 2, "cols": 4},
            "nodes": [
                {"id": "u", "type": "user", "label": "User", "pos": {"row": 0, "col": 0}},
                {"id": "app", "type": "system", "label": "App", "pos": {"row": 0, "col": 1}},
                {"id": "db", "type": "database", "label": "DB", "pos": {"row": 1, "col": 1}}
            ],
            "connectors": [
                {"from": "u", "to": "app", "arrow_head": "both", "label": "uses"},
                {"from": "app", "to": "db", "style": "dashed"}
            ],
            "boundaries": [{"label": "Backend", "nodes": ["app", "db", "missing"], "style": "dashed"}]
        })
    }

    #[test]
    fn nodes_sit_centered_in_their_cells() {
        let grid = Grid { rows: 2, cols: 4 };
        let area = Rect::new(0, 0, 4000, 2000);
        let frame = node_frame(area, grid, GridPos { row: 1, col: 2 });
        assert_eq!(frame, Rect::new(2150, 1150, 700, 700));
    }

    #[test]
    fn draws_boundaries_first_then_nodes_then_connectors() {
        let canvas = render_tool(SystemDiagram, sample(), AREA).unwrap();
        let kinds: Vec<&str> = canvas.shapes.iter().map(|s| s.kind.label()).collect();
        assert_eq!(
            kinds,
            vec![
                "Rounded Rectangle",
                "TextBox",
                "Oval",
                "Rounded Rectangle",
                "Can",
                "Connector",
                "TextBox",
                "Connector",
            ]
        );

        let boundary = &canvas.shapes[0];
        assert!(boundary.fill.is_none());
        assert_eq!(boundary.line.map(|l| l.dash), Some(Dash::Dash));
        let app = &canvas.shapes[3];
        let db = &canvas.shapes[4];
        assert_eq!(boundary.frame.left, app.frame.left - pt(BOUNDARY_PAD_PT));
        assert_eq!(boundary.frame.bottom(), db.frame.bottom() + pt(BOUNDARY_PAD_PT));
    }

    #[test]
    fn connectors_join_facing_edges() {
        let canvas = render_tool(SystemDiagram, sample(), AREA).unwrap();
        let user = &canvas.shapes[2];
        let app = &canvas.shapes[3];
        let db = &canvas.shapes[4];

        let ShapeKind::Connector(across) = &canvas.shapes[5].kind else {
            panic!("expected connector");
        };
        assert_eq!(across.style, RouteStyle::Straight);
        assert_eq!(across.points[0].0, user.frame.right());
        assert_eq!(across.points[1].0, app.frame.left);
        assert!(across.arrow_start && across.arrow_end);

        let ShapeKind::Connector(down) = &canvas.shapes[7].kind else {
            panic!("expected connector");
        };
        assert_eq!(down.points[0].1, app.frame.bottom());
        assert_eq!(down.points[1].1, db.frame.top);
        assert!(!down.arrow_start && !down.arrow_end);
        assert_eq!(canvas.shapes[7].line.map(|l| l.dash), Some(Dash::Dash));
    }
}
