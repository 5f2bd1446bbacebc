use serde::Deserialize;
use serde_json::Value;

use crate::document::{Font, HAlign, Line, Table, TableCell, TextFrame, VAlign};
use crate::error::ToolResult;
use crate::layout::partition::partition;
use crate::layout::types::{Rect, pt};
use crate::theme::Rgb;

use super::{RenderContext, Tool, parse_align, parse_valign};

/// Native table with optional header row/column, row banding and per-cell styling.
///
/// Always drawn flat onto the slide, never inside a group.
pub struct TableTool;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TableData {
    pub column_headers: Vec<CellSpec>,
    pub row_headers: Vec<CellSpec>,
    pub rows: Vec<Vec<CellSpec>>,
    pub banding: bool,
    /// Data row the banding starts on.
    pub band_start_index: i64,
    pub header_fill: String,
    pub header_text_color: String,
    pub band_fill: String,
    pub cell_text_color: String,
    pub font_size: f32,
    pub header_font_size: f32,
    pub align: String,
    /// Per-column alignment, row header column included.
    pub col_align: Vec<String>,
    pub wrap: bool,
    pub vertical_align: String,
    pub cell_padding_pt: f64,
    /// Weights; used only when there is one per column.
    pub col_widths: Option<Vec<f64>>,
    /// Weights; used only when there is one per row.
    pub row_heights: Option<Vec<f64>>,
    pub border: Option<String>,
}

impl Default for TableData {
    fn default() -> Self {
        Self {
            column_headers: Vec::new(),
            row_headers: Vec::new(),
            rows: Vec::new(),
            banding: true,
            band_start_index: 0,
            header_fill: "#DDEBF7".to_string(),
            header_text_color: "#0F172A".to_string(),
            band_fill: "#F2F2F2".to_string(),
            cell_text_color: "#111111".to_string(),
            font_size: 11.0,
            header_font_size: 12.0,
            align: "left".to_string(),
            col_align: Vec::new(),
            wrap: true,
            vertical_align: "middle".to_string(),
            cell_padding_pt: 4.0,
            col_widths: None,
            row_heights: None,
            border: None,
        }
    }
}

/// A bare scalar or `{value, fill, text_color, ..., style: {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CellSpec {
    Styled(StyledCell),
    Scalar(Value),
}

impl Default for CellSpec {
    fn default() -> Self {
        CellSpec::Scalar(Value::Null)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StyledCell {
    pub value: Value,
    #[serde(flatten)]
    pub direct: CellStyle,
    pub style: Option<CellStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CellStyle {
    pub fill: Option<String>,
    pub text_color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub align: Option<String>,
    pub vertical_align: Option<String>,
    pub font_size: Option<f32>,
}

impl CellStyle {
    /// Fields set on `self` win over `base`.
    fn over(&self, base: &CellStyle) -> CellStyle {
        CellStyle {
            fill: self.fill.clone().or_else(|| base.fill.clone()),
            text_color: self.text_color.clone().or_else(|| base.text_color.clone()),
            bold: self.bold.or(base.bold),
            italic: self.italic.or(base.italic),
            underline: self.underline.or(base.underline),
            align: self.align.clone().or_else(|| base.align.clone()),
            vertical_align: self.vertical_align.clone().or_else(|| base.vertical_align.clone()),
            font_size: self.font_size.filter(|s| *s > 0.0).or(base.font_size),
        }
    }
}

impl CellSpec {
    fn unpack(&self) -> (String, CellStyle) {
        match self {
            CellSpec::Scalar(value) => (scalar_text(value), CellStyle::default()),
            CellSpec::Styled(cell) => {
                let style = match &cell.style {
                    Some(nested) => cell.direct.over(nested),
                    None => cell.direct.clone(),
                };
                (scalar_text(&cell.value), style)
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Widths for `count` slots: weighted when one weight per slot is given,
/// equal otherwise.
fn extents(total: i64, count: usize, weights: Option<&[f64]>) -> Vec<i64> {
    let equal = vec![1.0; count];
    let weights = match weights {
        Some(w) if w.len() == count => w,
        Some(w) => {
            tracing::debug!(given = w.len(), expected = count, "ignoring mismatched table weights");
            equal.as_slice()
        }
        None => equal.as_slice(),
    };
    partition(total, weights, 0).into_iter().map(|s| s.size).collect()
}

struct CellDefaults {
    text_color: Rgb,
    font_size: f32,
    bold: bool,
    align: HAlign,
    vertical: VAlign,
    wrap: bool,
    padding: i64,
}

fn build_cell(text: &str, style: &CellStyle, defaults: &CellDefaults, ctx: &RenderContext<'_>) -> TableCell {
    let font = Font::sized(style.font_size.unwrap_or(defaults.font_size))
        .bold(style.bold.unwrap_or(defaults.bold))
        .italic(style.italic.unwrap_or(false))
        .underline(style.underline.unwrap_or(false))
        .colored(ctx.color(style.text_color.as_deref(), defaults.text_color));
    let mut frame = TextFrame::plain(text, font)
        .aligned(
            parse_align(style.align.as_deref(), defaults.align),
            parse_valign(style.vertical_align.as_deref(), defaults.vertical),
        )
        .with_inset(defaults.padding, defaults.padding);
    frame.wrap = defaults.wrap;
    TableCell { text: frame, fill: None }
}

impl Tool for TableTool {
    type Data = TableData;

    fn render(&self, data: &TableData, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        let has_col_header = !data.column_headers.is_empty();
        let has_row_header = !data.row_headers.is_empty();
        let data_cols = data
            .rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(data.column_headers.len());
        let col_offset = usize::from(has_row_header);
        let row_offset = usize::from(has_col_header);
        let n_cols = data_cols + col_offset;
        let n_rows = data.rows.len() + row_offset;
        if n_cols == 0 || n_rows == 0 {
            tracing::debug!("table has no cells; nothing to draw");
            return Ok(());
        }

        let header_fill = ctx.color(Some(&data.header_fill), Rgb::new(0xDD, 0xEB, 0xF7));
        let band_fill = ctx.color(Some(&data.band_fill), Rgb::new(0xF2, 0xF2, 0xF2));
        let default_align = parse_align(Some(&data.align), HAlign::Left);
        let vertical = parse_valign(Some(&data.vertical_align), VAlign::Middle);
        let padding = pt(data.cell_padding_pt.max(0.0));

        let header = CellDefaults {
            text_color: ctx.color(Some(&data.header_text_color), Rgb::new(0x0F, 0x17, 0x2A)),
            font_size: data.header_font_size,
            bold: true,
            align: HAlign::Center,
            vertical,
            wrap: data.wrap,
            padding,
        };
        let body_color = ctx.color(Some(&data.cell_text_color), Rgb::new(0x11, 0x11, 0x11));
        let body = |col: usize| CellDefaults {
            text_color: body_color,
            font_size: data.font_size,
            bold: false,
            align: parse_align(data.col_align.get(col).map(String::as_str), default_align),
            vertical,
            wrap: data.wrap,
            padding,
        };

        let mut cells: Vec<Vec<TableCell>> = Vec::with_capacity(n_rows);
        let blank = CellSpec::default();

        if has_col_header {
            let mut row = Vec::with_capacity(n_cols);
            if has_row_header {
                let mut corner = build_cell("", &CellStyle::default(), &header, ctx);
                corner.fill = Some(header_fill);
                row.push(corner);
            }
            for col in 0..data_cols {
                let (text, style) = data.column_headers.get(col).unwrap_or(&blank).unpack();
                let mut cell = build_cell(&text, &style, &header, ctx);
                cell.fill = Some(ctx.color(style.fill.as_deref(), header_fill));
                row.push(cell);
            }
            cells.push(row);
        }

        for (idx, source) in data.rows.iter().enumerate() {
            let mut row = Vec::with_capacity(n_cols);
            if has_row_header {
                let (text, style) = data.row_headers.get(idx).unwrap_or(&blank).unpack();
                let mut cell = build_cell(&text, &style, &header, ctx);
                cell.fill = Some(ctx.color(style.fill.as_deref(), header_fill));
                row.push(cell);
            }
            let banded = data.banding && (idx as i64 - data.band_start_index).rem_euclid(2) == 0;
            for col in 0..data_cols {
                let (text, style) = source.get(col).unwrap_or(&blank).unpack();
                let mut cell = build_cell(&text, &style, &body(col + col_offset), ctx);
                let band = banded.then_some(band_fill);
                cell.fill = style.fill.as_deref().and_then(Rgb::parse).or(band);
                row.push(cell);
            }
            cells.push(row);
        }

        let table = Table {
            col_widths: extents(geom.width, n_cols, data.col_widths.as_deref()),
            row_heights: extents(geom.height, n_rows, data.row_heights.as_deref()),
            cells,
            border: data
                .border
                .as_deref()
                .and_then(Rgb::parse)
                .map(|color| Line::solid(color, pt(0.75))),
        };
        ctx.sink.add_table(geom, table).set_name("Table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ShapeKind;
    use crate::tools::testing::{AREA, render_tool};
    use serde_json::json;

    fn table_of(data: Value) -> Table {
        let canvas = render_tool(TableTool, data, AREA).unwrap();
        assert_eq!(canvas.shapes.len(), 1);
        match canvas.shapes[0].kind.clone() {
            ShapeKind::Table(table) => table,
            other => panic!("expected table, got {}", other.label()),
        }
    }

    #[test]
    fn shape_counts_headers_and_pads_rows() {
        let table = table_of(json!({
            "column_headers": ["Q1", "Q2", "Q3"],
            "row_headers": ["North"],
            "rows": [[1, 2], [3, 4, 5]]
        }));
        assert_eq!(table.col_widths.len(), 4);
        assert_eq!(table.row_heights.len(), 3);
        assert_eq!(table.col_widths.iter().sum::<i64>(), AREA.width);
        assert_eq!(table.row_heights.iter().sum::<i64>(), AREA.height);

        let corner = &table.cells[0][0];
        assert_eq!(corner.text.plain_text(), "");
        assert_eq!(corner.fill, Some(Rgb::new(0xDD, 0xEB, 0xF7)));

        let header = &table.cells[0][1];
        assert_eq!(header.text.align, HAlign::Center);
        assert!(header.text.runs().next().unwrap().font.bold);

        // Row headers are padded to the row count and short rows to the data width.
        assert_eq!(table.cells[2][0].text.plain_text(), "");
        assert_eq!(table.cells[1][3].text.plain_text(), "");
        assert_eq!(table.cells[2][3].text.plain_text(), "5");
        assert_eq!(table.cells[2].len(), 4);
    }

    #[test]
    fn banding_alternates_and_cell_fill_wins() {
        let table = table_of(json!({
            "rows": [["a"], [{"value": "b"}], [{"value": "c", "style": {"fill": "#FF0000"}}], ["d"]],
            "band_start_index": 1
        }));
        let fills: Vec<Option<Rgb>> = table.cells.iter().map(|row| row[0].fill).collect();
        let band = Some(Rgb::new(0xF2, 0xF2, 0xF2));
        assert_eq!(fills, vec![None, band, Some(Rgb::new(255, 0, 0)), band]);
    }

    #[test]
    fn direct_cell_fields_override_nested_style() {
        let table = table_of(json!({
            "rows": [[{"value": 7.5, "bold": true, "align": "right", "style": {"bold": false, "italic": true, "font_size": 20}}]],
            "banding": false
        }));
        let cell = &table.cells[0][0];
        assert_eq!(cell.text.plain_text(), "7.5");
        assert_eq!(cell.text.align, HAlign::Right);
        let font = &cell.text.runs().next().unwrap().font;
        assert!(font.bold && font.italic);
        assert_eq!(font.size_pt, 20.0);
        assert_eq!(cell.fill, None);
    }

    #[test]
    fn weights_apply_only_when_lengths_match() {
        let table = table_of(json!({"rows": [["a", "b"]], "col_widths": [1, 3]}));
        assert_eq!(table.col_widths[1], 3 * table.col_widths[0]);

        let table = table_of(json!({"rows": [["a", "b"]], "col_widths": [1, 3, 5]}));
        assert_eq!(table.col_widths[0], table.col_widths[1]);
    }

    #[test]
    fn empty_table_draws_nothing() {
        let canvas = render_tool(TableTool, json!({}), AREA).unwrap();
        assert!(canvas.shapes.is_empty());
    }
}
