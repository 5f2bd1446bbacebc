use serde::{Deserialize, Serialize};

use crate::config::DecomposeConfig;

use super::geometry::pct_to_emu;
use super::types::Rect;

/// Floor applied to zero, negative or non-finite weights so every sibling keeps a sliver.
pub const MIN_WEIGHT: f64 = 0.001;

/// Upper bound on decomposition columns; deeper nodes share the last column.
pub const DEFAULT_MAX_COLUMNS: usize = 8;

/// One slice of a partitioned extent, offset relative to the extent start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub offset: i64,
    pub size: i64,
}

impl Span {
    pub fn end(&self) -> i64 {
        self.offset + self.size
    }
}

pub fn sanitize_weight(weight: Option<f64>) -> f64 {
    match weight {
        None => 1.0,
        Some(w) if w.is_finite() && w > 0.0 => w,
        Some(_) => MIN_WEIGHT,
    }
}

/// Splits `total` into `weights.len()` spans separated by `gap`.
///
/// The sizes plus gaps always add up to `total` exactly: every span except the last
/// is rounded from its share, and the last takes whatever is left. When the gaps
/// alone would exceed `total` they are dropped.
pub fn partition(total: i64, weights: &[f64], gap: i64) -> Vec<Span> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    let total = total.max(0);
    let mut gap = gap.max(0);
    let mut usable = total - gap * (n as i64 - 1);
    if usable < 0 {
        gap = 0;
        usable = total;
    }

    let weights: Vec<f64> = weights.iter().map(|w| sanitize_weight(Some(*w))).collect();
    let weight_sum: f64 = weights.iter().sum();

    let mut spans = Vec::with_capacity(n);
    let mut remaining = usable;
    let mut offset = 0;
    for (idx, weight) in weights.iter().enumerate() {
        let size = if idx + 1 == n {
            remaining
        } else {
            let share = (usable as f64 * weight / weight_sum).round() as i64;
            share.clamp(0, remaining)
        };
        remaining -= size;
        spans.push(Span { offset, size });
        offset += size + gap;
    }
    spans
}

/// Node of a box decomposition tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedNode {
    #[serde(default, alias = "content")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<WeightedNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<WeightedNode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<WeightedNode>>::deserialize(deserializer)?.unwrap_or_default())
}

impl WeightedNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_children(name: impl Into<String>, children: Vec<WeightedNode>) -> Self {
        Self {
            name: name.into(),
            children,
            weight: None,
        }
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Edges from this node to its deepest leaf.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub col_gap_pct: f64,
    pub row_gap_pct: f64,
    pub header_band_pct: f64,
    pub first_column_ratio: f64,
    pub max_columns: usize,
    pub with_headers: bool,
}

impl TreeOptions {
    pub fn from_config(config: &DecomposeConfig, with_headers: bool) -> Self {
        Self {
            col_gap_pct: config.col_gap_pct,
            row_gap_pct: config.row_gap_pct,
            header_band_pct: config.header_band_pct,
            first_column_ratio: config.first_column_ratio,
            max_columns: DEFAULT_MAX_COLUMNS,
            with_headers,
        }
    }
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self::from_config(&DecomposeConfig::default(), false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedNode {
    pub name: String,
    pub column: usize,
    pub depth: usize,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeLayout {
    /// Absolute column bands (full area height).
    pub columns: Vec<Rect>,
    /// Header band per column when headers were requested.
    pub headers: Vec<Rect>,
    pub content: Rect,
    /// Pre-order: parents before their children.
    pub nodes: Vec<PlacedNode>,
}

/// Lays out a forest of weighted nodes as columns of stacked boxes.
///
/// A node's vertical span is split among its children (by weight, separated by the
/// row gap) in the next column to the right.
pub fn layout_tree(roots: &[WeightedNode], area: Rect, options: &TreeOptions) -> TreeLayout {
    let max_depth = roots.iter().map(WeightedNode::depth).max().unwrap_or(0);
    let cols = (max_depth + 1).clamp(1, options.max_columns.max(1));

    let columns = column_bands(area, cols, options);

    let header_h = if options.with_headers {
        pct_to_emu(options.header_band_pct.max(0.0), area.height).clamp(0, area.height)
    } else {
        0
    };
    let content = Rect::new(area.left, area.top + header_h, area.width, area.height - header_h);
    let headers = if options.with_headers {
        columns
            .iter()
            .map(|col| Rect::new(col.left, area.top, col.width, header_h))
            .collect()
    } else {
        Vec::new()
    };

    let row_gap = pct_to_emu(options.row_gap_pct.max(0.0), area.height);
    let mut placer = Placer {
        columns: &columns,
        content,
        row_gap,
        nodes: Vec::new(),
    };

    let weights: Vec<f64> = roots.iter().map(|r| sanitize_weight(r.weight)).collect();
    for (root, span) in roots.iter().zip(partition(content.height, &weights, row_gap)) {
        placer.place(root, 0, 0, content.top + span.offset, span.size);
    }

    TreeLayout {
        nodes: placer.nodes,
        columns,
        headers,
        content,
    }
}

fn column_bands(area: Rect, cols: usize, options: &TreeOptions) -> Vec<Rect> {
    if cols == 1 {
        return vec![area];
    }
    let mut gap = pct_to_emu(options.col_gap_pct.max(0.0), area.width);
    let mut remaining = area.width - gap * (cols as i64 - 1);
    if remaining < 0 {
        gap = 0;
        remaining = area.width.max(0);
    }
    let first = (remaining as f64 * options.first_column_ratio.clamp(0.0, 1.0)) as i64;
    let rest = remaining - first;
    let other = rest / (cols as i64 - 1);

    let mut bands = Vec::with_capacity(cols);
    let mut x = area.left;
    for idx in 0..cols {
        let width = match idx {
            0 => first,
            i if i + 1 == cols => rest - other * (cols as i64 - 2),
            _ => other,
        };
        bands.push(Rect::new(x, area.top, width, area.height));
        x += width + gap;
    }
    bands
}

struct Placer<'a> {
    columns: &'a [Rect],
    content: Rect,
    row_gap: i64,
    nodes: Vec<PlacedNode>,
}

impl Placer<'_> {
    fn place(&mut self, node: &WeightedNode, column: usize, depth: usize, top: i64, height: i64) {
        let top = top.max(self.content.top);
        let height = height.min(self.content.bottom() - top).max(0);
        let band = self.columns[column];
        self.nodes.push(PlacedNode {
            name: node.name.clone(),
            column,
            depth,
            rect: Rect::new(band.left, top, band.width, height),
        });

        if node.children.is_empty() {
            return;
        }
        let child_column = (column + 1).min(self.columns.len() - 1);
        let weights: Vec<f64> = node
            .children
            .iter()
            .map(|child| sanitize_weight(child.weight))
            .collect();
        let spans = partition(height, &weights, self.row_gap);
        for (child, span) in node.children.iter().zip(spans) {
            self.place(child, child_column, depth + 1, top + span.offset, span.size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(spans: &[Span]) -> i64 {
        let gaps: i64 = spans.windows(2).map(|w| w[1].offset - w[0].end()).sum();
        spans.iter().map(|s| s.size).sum::<i64>() + gaps
    }

    #[test]
    fn sums_are_exact_for_awkward_weights() {
        let cases: [(i64, &[f64], i64); 6] = [
            (1000, &[1.0, 1.0, 1.0], 10),
            (1001, &[0.3, 0.3, 0.4], 7),
            (5_143_500, &[1.0, 2.0, 3.0, 5.0, 8.0], 51_435),
            (17, &[1e-9, 1e9], 0),
            (999, &[0.0, -3.0, f64::NAN, 2.0], 3),
            (0, &[1.0, 1.0], 0),
        ];
        for (total, weights, gap) in cases {
            let spans = partition(total, weights, gap);
            assert_eq!(spans.len(), weights.len());
            assert!(spans.iter().all(|s| s.size >= 0));
            assert_eq!(covered(&spans), total);
            if gap > 0 && spans.len() > 1 {
                assert!(spans.windows(2).all(|w| w[1].offset - w[0].end() == gap));
            }
            assert_eq!(spans.last().map(Span::end), Some(total));
        }
    }

    #[test]
    fn proportional_shares() {
        let spans = partition(600, &[1.0, 2.0], 0);
        assert_eq!(spans, vec![Span { offset: 0, size: 200 }, Span { offset: 200, size: 400 }]);
    }

    #[test]
    fn oversized_gap_is_dropped() {
        let spans = partition(10, &[1.0, 1.0, 1.0], 20);
        assert_eq!(spans.iter().map(|s| s.size).sum::<i64>(), 10);
        assert_eq!(spans[1].offset, spans[0].end());
    }

    #[test]
    fn empty_weights_give_no_spans() {
        assert!(partition(100, &[], 5).is_empty());
    }

    #[test]
    fn bad_weights_are_floored_not_dropped() {
        assert_eq!(sanitize_weight(None), 1.0);
        assert_eq!(sanitize_weight(Some(0.0)), MIN_WEIGHT);
        assert_eq!(sanitize_weight(Some(-2.0)), MIN_WEIGHT);
        assert_eq!(sanitize_weight(Some(f64::INFINITY)), MIN_WEIGHT);
        let spans = partition(10_000, &[0.0, 1.0], 0);
        assert!(spans[0].size < spans[1].size);
    }

    #[test]
    fn single_leaf_spans_the_whole_area() {
        let area = Rect::new(100, 200, 5000, 3000);
        let layout = layout_tree(&[WeightedNode::leaf("only")], area, &TreeOptions::default());
        assert_eq!(layout.columns, vec![area]);
        assert_eq!(layout.nodes.len(), 1);
        assert_eq!(layout.nodes[0].rect, area);
    }

    #[test]
    fn children_fill_parent_height_in_next_column() {
        let tree = WeightedNode::with_children(
            "Revenue",
            vec![
                WeightedNode::leaf("Price").weighted(1.0),
                WeightedNode::leaf("Volume").weighted(3.0),
            ],
        );
        let area = Rect::new(0, 0, 10_000, 8_000);
        let layout = layout_tree(&[tree], area, &TreeOptions::default());
        assert_eq!(layout.columns.len(), 2);

        let root = &layout.nodes[0];
        let price = &layout.nodes[1];
        let volume = &layout.nodes[2];
        assert_eq!(root.column, 0);
        assert_eq!(price.column, 1);
        assert_eq!(price.rect.top, root.rect.top);
        assert_eq!(volume.rect.bottom(), root.rect.bottom());
        let gap = volume.rect.top - price.rect.bottom();
        assert_eq!(gap, 80);
        assert_eq!(price.rect.height + gap + volume.rect.height, root.rect.height);
        assert!(volume.rect.height > price.rect.height * 2);
    }

    #[test]
    fn first_column_is_narrow_and_bands_fill_width() {
        let tree = WeightedNode::with_children(
            "a",
            vec![WeightedNode::with_children("b", vec![WeightedNode::leaf("c")])],
        );
        let area = Rect::new(0, 0, 10_001, 1000);
        let layout = layout_tree(&[tree], area, &TreeOptions::default());
        let cols = &layout.columns;
        assert_eq!(cols.len(), 3);
        assert!(cols[0].width < cols[1].width);
        assert_eq!(cols[2].right(), area.right());
        assert!(cols.windows(2).all(|w| w[0].right() < w[1].left));
    }

    #[test]
    fn root_list_is_split_like_siblings_below_headers() {
        let roots = vec![WeightedNode::leaf("x"), WeightedNode::leaf("y").weighted(2.0)];
        let area = Rect::new(0, 0, 1000, 10_000);
        let options = TreeOptions {
            with_headers: true,
            ..TreeOptions::default()
        };
        let layout = layout_tree(&roots, area, &options);
        assert_eq!(layout.headers.len(), 1);
        assert_eq!(layout.content.top, 800);
        assert_eq!(layout.nodes[0].rect.top, 800);
        assert_eq!(layout.nodes[1].rect.bottom(), area.bottom());
    }

    #[test]
    fn deep_trees_share_the_last_column() {
        let mut node = WeightedNode::leaf("leaf");
        for level in 0..5 {
            node = WeightedNode::with_children(format!("n{level}"), vec![node]);
        }
        let options = TreeOptions {
            max_columns: 3,
            ..TreeOptions::default()
        };
        let layout = layout_tree(&[node], Rect::new(0, 0, 9000, 9000), &options);
        assert_eq!(layout.columns.len(), 3);
        assert_eq!(layout.nodes.last().map(|n| n.column), Some(2));
        assert_eq!(layout.nodes.last().map(|n| n.depth), Some(5));
    }

    #[test]
    fn nodes_deserialize_with_content_alias() {
        let node: WeightedNode = serde_json::from_value(serde_json::json!({
            "content": "Cost",
            "children": null,
            "weight": 2
        }))
        .unwrap();
        assert_eq!(node.name, "Cost");
        assert!(node.children.is_empty());
        assert_eq!(node.weight, Some(2.0));
    }
}
