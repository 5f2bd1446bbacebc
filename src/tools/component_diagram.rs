use serde::Deserialize;
use std::collections::HashMap;

use crate::document::{Dash, Font, HAlign, Line, ShapeId, VAlign};
use crate::error::ToolResult;
use crate::layout::routing::route;
use crate::layout::types::{Rect, pt};
use crate::theme::Rgb;

use super::{RenderContext, Tool, centered, text};

const LABEL_W_PT: f64 = 100.0;
const LABEL_H_PT: f64 = 28.0;
const LABEL_PT: f32 = 10.0;

/// Boxes placed by percent inside the area, joined by routed, glued connectors.
pub struct ComponentDiagram;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ComponentDiagramData {
    pub nodes: Vec<ComponentNode>,
    pub connectors: Vec<ComponentConnector>,
}

#[derive(Debug, Deserialize)]
pub struct ComponentNode {
    pub id: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub label: Option<String>,
    /// Percent of the area.
    pub pos: NodePos,
    #[serde(default)]
    pub style: NodeStyle,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    User,
    #[default]
    #[serde(other)]
    Rect,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NodePos {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl NodePos {
    fn absolute(&self, area: Rect) -> Rect {
        let scale = |extent: i64, pct: f64| (extent as f64 * pct / 100.0) as i64;
        Rect::new(
            area.left + scale(area.width, self.x),
            area.top + scale(area.height, self.y),
            scale(area.width, self.w),
            scale(area.height, self.h),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NodeStyle {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_pt: f64,
    pub font_color: Option<String>,
    pub font_size: Option<f32>,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_pt: 1.2,
            font_color: None,
            font_size: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ComponentConnector {
    #[serde(alias = "from_")]
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub style: ConnectorStyle,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConnectorStyle {
    pub color: String,
    pub pt: f64,
    pub dash: Option<String>,
}

impl Default for ConnectorStyle {
    fn default() -> Self {
        Self {
            color: "#888888".to_string(),
            pt: 1.2,
            dash: None,
        }
    }
}

impl Tool for ComponentDiagram {
    type Data = ComponentDiagramData;

    fn render(&self, data: &ComponentDiagramData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        let text_color = ctx.text_color();
        let mut placed: HashMap<&str, (ShapeId, Rect)> = HashMap::new();

        for node in &data.nodes {
            let frame = node.pos.absolute(geom);
            let st = &node.style;
            let default_fill = match node.kind {
                NodeKind::User => Rgb::new(0xF0, 0xF4, 0xFF),
                NodeKind::Rect => Rgb::WHITE,
            };
            let fill = ctx.color(st.fill.as_deref(), default_fill);
            let stroke = ctx.color(st.stroke.as_deref(), ctx.theme_color("line", "#888888"));
            let font = Font::sized(st.font_size.unwrap_or(11.0))
                .colored(ctx.color(st.font_color.as_deref(), text_color));
            let label = node.label.as_deref().unwrap_or_default();

            let shape = match node.kind {
                NodeKind::User => ctx.sink.add_round_rect(frame, 0.15),
                NodeKind::Rect => ctx.sink.add_rect(frame),
            };
            shape
                .set_name(node.id.clone())
                .set_fill(fill)
                .set_line(Line::solid(stroke, pt(st.stroke_pt)))
                .set_text(text(label, font, HAlign::Center, VAlign::Middle));
            placed.insert(node.id.as_str(), (shape.id, frame));
        }

        let routing = &ctx.config.layout.routing;
        for conn in &data.connectors {
            let (Some(&(from_id, from)), Some(&(to_id, to))) =
                (placed.get(conn.from.as_str()), placed.get(conn.to.as_str()))
            else {
                tracing::debug!(from = %conn.from, to = %conn.to, "skipping connector to an unknown node");
                continue;
            };
            let path = route(&from, &to, routing.margin, routing);
            let color = ctx.color(Some(&conn.style.color), Rgb::new(0x88, 0x88, 0x88));
            let dash = conn.style.dash.as_deref().map(Dash::parse).unwrap_or_default();
            ctx.sink
                .add_connector(&path, Some(from_id), Some(to_id))
                .set_name(format!("{} -> {}", conn.from, conn.to))
                .set_line(Line::solid(color, pt(conn.style.pt)).dashed(dash));

            if let Some(label) = conn.label.as_deref().filter(|l| !l.trim().is_empty()) {
                let mid = path.start.midpoint(path.end);
                let frame = centered(mid.x, mid.y, pt(LABEL_W_PT), pt(LABEL_H_PT));
                let font = Font::sized(LABEL_PT).colored(text_color);
                ctx.sink
                    .add_textbox(frame, text(label, font, HAlign::Center, VAlign::Middle))
                    .set_name("Connector Label");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ShapeKind;
    use crate::layout::routing::{RouteStyle, Site};
    use crate::tools::testing::{AREA, render_tool};
    use serde_json::json;

    fn diagram(connectors: serde_json::Value) -> serde_json::Value {
        json!({
            "nodes": [
                {"id": "web", "kind": "user", "label": "Browser", "pos": {"x": 0, "y": 40, "w": 20, "h": 20}},
                {"id": "api", "label": "API", "pos": {"x": 40, "y": 40, "w": 20, "h": 20}},
                {"id": "db", "kind": "cylinder", "label": "DB", "pos": {"x": 70, "y": 0, "w": 20, "h": 20}}
            ],
            "connectors": connectors
        })
    }

    #[test]
    fn side_by_side_nodes_get_a_straight_glued_connector() {
        let canvas = render_tool(
            ComponentDiagram,
            diagram(json!([{"from": "web", "to": "api", "label": "HTTPS", "style": {"dash": "dashed"}}])),
            AREA,
        )
        .unwrap();
        assert_eq!(canvas.shapes.len(), 5);
        assert!(matches!(canvas.shapes[0].kind, ShapeKind::RoundRect { .. }));
        assert_eq!(canvas.shapes[0].fill, Some(Rgb::new(0xF0, 0xF4, 0xFF)));
        assert!(matches!(canvas.shapes[2].kind, ShapeKind::Rect));

        let conn_shape = &canvas.shapes[3];
        let ShapeKind::Connector(conn) = &conn_shape.kind else {
            panic!("expected connector");
        };
        assert_eq!(conn.style, RouteStyle::Straight);
        assert_eq!(conn.begin, Some((canvas.shapes[0].id, Site::Right)));
        assert_eq!(conn.end, Some((canvas.shapes[1].id, Site::Left)));
        assert!(conn.arrow_end);
        assert_eq!(conn_shape.line.map(|l| l.dash), Some(Dash::Dash));

        let label = &canvas.shapes[4];
        assert_eq!(label.text.as_ref().unwrap().plain_text(), "HTTPS");
        assert_eq!(label.frame.width, pt(LABEL_W_PT));
    }

    #[test]
    fn diagonal_pairs_route_with_an_elbow() {
        let canvas = render_tool(ComponentDiagram, diagram(json!([{"from": "api", "to": "db"}])), AREA).unwrap();
        let ShapeKind::Connector(conn) = &canvas.shapes[3].kind else {
            panic!("expected connector");
        };
        assert_eq!(conn.style, RouteStyle::Elbow);
    }

    #[test]
    fn connectors_to_unknown_nodes_are_skipped() {
        let canvas = render_tool(
            ComponentDiagram,
            diagram(json!([{"from": "web", "to": "ghost"}, {"from_": "api", "to": "web"}])),
            AREA,
        )
        .unwrap();
        let connectors = canvas
            .shapes
            .iter()
            .filter(|s| matches!(s.kind, ShapeKind::Connector(_)))
            .count();
        assert_eq!(connectors, 1);
    }

    #[test]
    fn node_positions_are_percent_of_the_area() {
        let pos = NodePos { x: 50.0, y: 25.0, w: 10.0, h: 50.0 };
        let r = pos.absolute(Rect::new(100, 200, 1000, 400));
        assert_eq!(r, Rect::new(600, 300, 100, 200));
    }
}
