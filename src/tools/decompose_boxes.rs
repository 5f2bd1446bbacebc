use serde::Deserialize;

use crate::document::{Font, HAlign, VAlign};
use crate::error::ToolResult;
use crate::layout::partition::{TreeOptions, WeightedNode, layout_tree};
use crate::layout::types::Rect;

use super::{RenderContext, Tool, text};

const BOX_RADIUS: f64 = 0.08;
const NODE_PT: f32 = 12.0;
const HEADER_PT: f32 = 10.0;

/// Hierarchical breakdown: one column per tree level, children stacked beside
/// their parent and sharing its height.
pub struct DecomposeBoxes;

#[derive(Debug, Deserialize)]
pub struct DecomposeBoxesData {
    pub root: Roots,
    #[serde(default)]
    pub column_headers: Option<Vec<String>>,
}

/// A single root node or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Roots {
    Many(Vec<WeightedNode>),
    One(WeightedNode),
}

impl Roots {
    fn as_slice(&self) -> &[WeightedNode] {
        match self {
            Roots::Many(nodes) => nodes,
            Roots::One(node) => std::slice::from_ref(node),
        }
    }
}

impl Tool for DecomposeBoxes {
    type Data = DecomposeBoxesData;

    fn render(&self, data: &DecomposeBoxesData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        let headers = data.column_headers.as_deref().unwrap_or_default();
        let decompose = &ctx.config.layout.decompose;
        let options = TreeOptions::from_config(decompose, !headers.is_empty());
        let layout = layout_tree(data.root.as_slice(), geom, &options);
        tracing::debug!(
            columns = layout.columns.len(),
            boxes = layout.nodes.len(),
            "decomposition laid out"
        );

        let text_color = ctx.text_color();
        // Only columns that were given a header get one.
        for (band, title) in layout.headers.iter().zip(headers) {
            let font = Font::sized(HEADER_PT).bold(true).colored(text_color);
            ctx.sink
                .add_textbox(*band, text(title, font, HAlign::Left, VAlign::Top))
                .set_name(format!("Column Header {title}"));
        }

        let first_fill = ctx.color(Some(&decompose.first_column_fill), ctx.theme_color("accent", "#DDEBF7"));
        let other_fill = ctx.color(Some(&decompose.other_column_fill), ctx.theme_color("muted", "#F2F2F2"));
        for node in &layout.nodes {
            let fill = if node.column == 0 { first_fill } else { other_fill };
            let font = Font::sized(NODE_PT).bold(node.column <= 1).colored(text_color);
            ctx.sink
                .add_round_rect(node.rect, BOX_RADIUS)
                .set_name(if node.name.is_empty() { "Box".to_string() } else { node.name.clone() })
                .set_fill(fill)
                .set_text(text(&node.name, font, HAlign::Left, VAlign::Top));
        }
        Ok(())
    }
}
