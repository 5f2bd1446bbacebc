//! Tool contract, the static tool registry and the built-in tools.
//!
//! A modern tool declares a typed `Data` schema; deserializing the component's
//! `data` into it is the validation step. A legacy tool is a bare function that
//! receives the raw JSON and validates nothing up front.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::document::{Font, HAlign, ShapeSink, TextFrame, VAlign};
use crate::error::ToolResult;
use crate::layout::types::Rect;
use crate::orchestrator::SlideRegistry;
use crate::theme::{Rgb, Theme};

mod bar_chart;
mod component_diagram;
mod decompose_boxes;
mod layout_separators;
mod main_message;
mod pie_chart;
mod plain_box;
mod progress_bar;
mod slide_title;
mod system_diagram;
mod table;

pub use bar_chart::BarChart;
pub use component_diagram::ComponentDiagram;
pub use decompose_boxes::DecomposeBoxes;
pub use layout_separators::LayoutSeparators;
pub use main_message::MainMessage;
pub use pie_chart::PieChart;
pub use plain_box::PlainBox;
pub use progress_bar::ProgressBar;
pub use slide_title::SlideTitle;
pub use system_diagram::SystemDiagram;
pub use table::TableTool;

/// Everything a renderer may read or draw into.
pub struct RenderContext<'a> {
    pub theme: &'a Theme,
    pub config: &'a Config,
    /// Components already rendered on this slide.
    pub registry: &'a SlideRegistry,
    pub sink: ShapeSink<'a>,
    /// Component-level `style` overrides.
    pub style: &'a BTreeMap<String, Value>,
    /// 1-based.
    pub slide_index: usize,
    pub component_id: &'a str,
}

impl RenderContext<'_> {
    pub fn font_family(&self) -> &str {
        &self.theme.font_family
    }

    pub fn text_color(&self) -> Rgb {
        self.theme.text_color()
    }

    /// Resolves a hex color or a theme color name; `fallback` otherwise.
    pub fn color(&self, value: Option<&str>, fallback: Rgb) -> Rgb {
        resolve_color(self.theme, value, fallback)
    }

    /// Named theme color with a hex fallback.
    pub fn theme_color(&self, name: &str, fallback: &str) -> Rgb {
        self.theme.color(name, fallback)
    }

    pub fn style_str(&self, key: &str) -> Option<&str> {
        self.style.get(key).and_then(Value::as_str)
    }
}

pub fn resolve_color(theme: &Theme, value: Option<&str>, fallback: Rgb) -> Rgb {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return fallback;
    };
    Rgb::parse(value)
        .or_else(|| theme.colors.get(value).and_then(|c| Rgb::parse(c)))
        .unwrap_or(fallback)
}

/// A validated, schema-typed tool.
pub trait Tool: Send + Sync {
    type Data: DeserializeOwned + 'static;

    fn render(&self, data: &Self::Data, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult;
}

/// Validated data bound to its renderer, ready to draw.
pub type PreparedRender<'t> = Box<dyn FnOnce(Rect, &mut RenderContext<'_>) -> ToolResult + 't>;

/// Object-safe face of [`Tool`]: validation produces a prepared render.
pub trait DynTool: Send + Sync {
    fn prepare<'t>(&'t self, data: &Value) -> Result<PreparedRender<'t>, String>;
}

impl<T: Tool> DynTool for T {
    fn prepare<'t>(&'t self, data: &Value) -> Result<PreparedRender<'t>, String> {
        let typed: T::Data = serde_json::from_value(data.clone()).map_err(|err| err.to_string())?;
        Ok(Box::new(move |geom: Rect, ctx: &mut RenderContext<'_>| {
            self.render(&typed, geom, ctx)
        }))
    }
}

/// Render-only tool without a schema.
pub type LegacyRender = fn(&Value, Rect, &mut RenderContext<'_>) -> ToolResult;

pub enum ToolLookup<'r> {
    Modern(&'r dyn DynTool),
    Legacy(LegacyRender),
    Missing,
}

/// Static name → tool table. Names are stored sanitized.
#[derive(Default)]
pub struct ToolRegistry {
    modern: BTreeMap<String, Box<dyn DynTool>>,
    legacy: BTreeMap<String, LegacyRender>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in tool.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("slide_title", SlideTitle);
        registry.register("main_message", MainMessage);
        registry.register("plain_box", PlainBox);
        registry.register("layout_separators", LayoutSeparators);
        registry.register("decompose_boxes", DecomposeBoxes);
        registry.register("component_diagram", ComponentDiagram);
        registry.register("system_diagram", SystemDiagram);
        registry.register("table", TableTool);
        registry.register("bar_chart", BarChart);
        registry.register("pie_chart", PieChart);
        registry.register("progress_bar", ProgressBar);
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, name: &str, tool: T) {
        self.modern.insert(sanitize_tool_name(name), Box::new(tool));
    }

    pub fn register_legacy(&mut self, name: &str, render: LegacyRender) {
        self.legacy.insert(sanitize_tool_name(name), render);
    }

    /// Modern entry first, then legacy.
    pub fn lookup(&self, name: &str) -> ToolLookup<'_> {
        let key = sanitize_tool_name(name);
        if let Some(tool) = self.modern.get(&key) {
            return ToolLookup::Modern(tool.as_ref());
        }
        if let Some(render) = self.legacy.get(&key) {
            return ToolLookup::Legacy(*render);
        }
        ToolLookup::Missing
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .modern
            .keys()
            .chain(self.legacy.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// `" Bar-Chart "` → `"bar_chart"`.
pub fn sanitize_tool_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_ascii_lowercase()
}

// ── Shared drawing helpers ──────────────────────────────────────────

/// Single-paragraph text frame.
pub(crate) fn text(text: &str, font: Font, align: HAlign, vertical: VAlign) -> TextFrame {
    TextFrame::plain(text.trim(), font).aligned(align, vertical)
}

pub(crate) fn parse_align(value: Option<&str>, fallback: HAlign) -> HAlign {
    value.and_then(HAlign::parse).unwrap_or(fallback)
}

pub(crate) fn parse_valign(value: Option<&str>, fallback: VAlign) -> VAlign {
    value.and_then(VAlign::parse).unwrap_or(fallback)
}

/// Theme colors cycled through by chart series and pie slices.
pub(crate) fn series_palette(theme: &Theme) -> Vec<Rgb> {
    [
        ("primary", "#0D6EFD"),
        ("warning", "#FFC107"),
        ("success", "#198754"),
        ("danger", "#DC3545"),
        ("secondary", "#6C757D"),
    ]
    .iter()
    .map(|(name, fallback)| theme.color(name, fallback))
    .collect()
}

/// Box of `w`×`h` centered on `(cx, cy)`.
pub(crate) fn centered(cx: f64, cy: f64, w: i64, h: i64) -> Rect {
    Rect::new(cx as i64 - w / 2, cy as i64 - h / 2, w, h)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop_legacy(_: &Value, _: Rect, _: &mut RenderContext<'_>) -> ToolResult {
        Ok(())
    }

    #[test]
    fn sanitizes_names_like_module_names() {
        assert_eq!(sanitize_tool_name(" Bar-Chart "), "bar_chart");
        assert_eq!(sanitize_tool_name("pie chart"), "pie_chart");
        assert_eq!(sanitize_tool_name("a.b/c"), "a_b_c");
    }

    #[test]
    fn modern_entry_wins_over_legacy() {
        let mut registry = ToolRegistry::builtin();
        registry.register_legacy("plain_box", noop_legacy);
        registry.register_legacy("custom", noop_legacy);
        assert!(matches!(registry.lookup("Plain-Box"), ToolLookup::Modern(_)));
        assert!(matches!(registry.lookup("custom"), ToolLookup::Legacy(_)));
        assert!(matches!(registry.lookup("pyramid_hierarchy"), ToolLookup::Missing));
    }

    #[test]
    fn builtin_registry_lists_every_tool() {
        let registry = ToolRegistry::builtin();
        assert_eq!(registry.names().len(), 11);
    }

    #[test]
    fn prepare_rejects_data_that_does_not_match_the_schema() {
        let err = PlainBox.prepare(&json!({"style": {}})).err();
        assert!(err.is_some_and(|msg| msg.contains("text")));
    }

    #[test]
    fn colors_resolve_hex_then_theme_names() {
        let theme = Theme::standard();
        assert_eq!(resolve_color(&theme, Some("#010203"), Rgb::BLACK), Rgb::new(1, 2, 3));
        assert_eq!(
            resolve_color(&theme, Some("primary"), Rgb::BLACK),
            Rgb::new(0x0D, 0x6E, 0xFD)
        );
        assert_eq!(resolve_color(&theme, Some("nope"), Rgb::WHITE), Rgb::WHITE);
        assert_eq!(resolve_color(&theme, None, Rgb::WHITE), Rgb::WHITE);
    }
}
