use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::tools::sanitize_tool_name;

/// Tool name reserved for slide titles; the orchestrator injects it when a slide has a title.
pub const SLIDE_TITLE_TOOL: &str = "slide_title";
/// Z-index given to the injected title so it renders before everything else.
pub const AUTO_TITLE_Z_INDEX: i64 = -1000;

/// Canonical deck IR: `{version, meta, theme, slides}`.
///
/// Only the container shape is strict. Ill-typed scalars below the root are
/// dropped, and components that do not fit their fields are kept as
/// [`Component::malformed`] so the orchestrator can skip them one by one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default = "default_version", deserialize_with = "lenient_version")]
    pub version: i64,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default, deserialize_with = "lenient_map")]
    pub theme: BTreeMap<String, Value>,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

fn default_version() -> i64 {
    1
}

impl Presentation {
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Sorted, de-duplicated tool names used across the deck.
    pub fn tools_used(&self) -> Vec<String> {
        let mut tools: Vec<String> = self
            .slides
            .iter()
            .flat_map(|slide| slide.components.iter().map(|c| c.tool.clone()))
            .filter(|tool| !tool.is_empty())
            .collect();
        tools.sort();
        tools.dedup();
        tools
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub slide_size: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Numbers and booleans are kept as text; other non-string titles are dropped.
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, deserialize_with = "lenient_components")]
    pub components: Vec<Component>,
}

impl Slide {
    /// Explicit id, else the slugified title, else `None`.
    pub fn resolved_id(&self) -> Option<String> {
        if let Some(id) = self.id.as_deref().filter(|id| !id.trim().is_empty()) {
            return Some(id.to_string());
        }
        self.title
            .as_deref()
            .map(slugify)
            .filter(|slug| !slug.is_empty())
    }

    /// Whether any component already draws the title (tool names compared sanitized).
    pub fn has_title_component(&self) -> bool {
        self.components
            .iter()
            .any(|c| sanitize_tool_name(&c.tool) == SLIDE_TITLE_TOOL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Component {
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<PercentBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    pub data: Value,
    pub style: BTreeMap<String, Value>,
    pub group: bool,
    /// Why the component's fields could not be read. Such a component is
    /// skipped at render time with a validation error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed: Option<String>,
}

/// Strict field layout of a component mapping.
#[derive(Deserialize)]
struct ComponentFields {
    #[serde(default)]
    tool: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    pos: Option<PercentBox>,
    #[serde(default)]
    anchor: Option<Anchor>,
    #[serde(default)]
    z_index: Option<i64>,
    #[serde(default = "empty_object", deserialize_with = "null_as_empty_object")]
    data: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    style: BTreeMap<String, Value>,
    #[serde(default = "default_group", deserialize_with = "null_as_group_default")]
    group: bool,
}

impl From<Value> for Component {
    fn from(raw: Value) -> Self {
        if !raw.is_object() {
            return Self::from_malformed(&raw, "component must be a mapping".to_string());
        }
        match ComponentFields::deserialize(&raw) {
            Ok(f) => Self {
                tool: f.tool,
                id: f.id,
                pos: f.pos,
                anchor: f.anchor,
                z_index: f.z_index,
                data: f.data,
                style: f.style,
                group: f.group,
                malformed: None,
            },
            Err(err) => Self::from_malformed(&raw, format!("invalid component fields: {err}")),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn default_group() -> bool {
    true
}

impl Component {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            id: None,
            pos: None,
            anchor: None,
            z_index: None,
            data: empty_object(),
            style: BTreeMap::new(),
            group: true,
            malformed: None,
        }
    }

    /// Keeps whatever identifies the component (tool, id, integer z-index) so
    /// the skip can still be reported and ordered.
    fn from_malformed(raw: &Value, reason: String) -> Self {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            id: text("id"),
            z_index: raw.get("z_index").and_then(Value::as_i64),
            malformed: Some(reason),
            ..Self::new(text("tool").unwrap_or_default())
        }
    }

    pub fn z(&self) -> i64 {
        self.z_index.unwrap_or(0)
    }

    /// Synthetic title component for a slide without an explicit one.
    pub fn auto_title(title: &str) -> Self {
        let mut data = serde_json::Map::new();
        data.insert("title".to_string(), Value::String(title.to_string()));
        Self {
            id: Some("auto_title".to_string()),
            anchor: Some(Anchor::Title),
            z_index: Some(AUTO_TITLE_Z_INDEX),
            data: Value::Object(data),
            ..Self::new(SLIDE_TITLE_TOOL)
        }
    }
}

/// Percent box; each field is independently optional and expressed in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentBox {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
}

impl PercentBox {
    pub const fn full() -> Self {
        Self {
            x: Some(0.0),
            y: Some(0.0),
            w: Some(100.0),
            h: Some(100.0),
        }
    }

    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            w: Some(w),
            h: Some(h),
        }
    }
}

/// Named layout role used to fill in geometry the component leaves out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Anchor {
    Title,
    Left,
    Right,
    Top,
    Bottom,
    Center,
    TwoPanelLeft,
    TwoPanelRight,
    Other(String),
}

impl Anchor {
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "title" => Self::Title,
            "left" => Self::Left,
            "right" => Self::Right,
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            "center" | "centre" => Self::Center,
            "two_panel_left" | "bottom_left" | "two_panel_bottom_left" => Self::TwoPanelLeft,
            "two_panel_right" | "bottom_right" | "two_panel_bottom_right" => Self::TwoPanelRight,
            _ => Self::Other(keyword.to_string()),
        }
    }

    pub fn keyword(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Center => "center",
            Self::TwoPanelLeft => "two_panel_left",
            Self::TwoPanelRight => "two_panel_right",
            Self::Other(name) => name,
        }
    }
}

impl Serialize for Anchor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.keyword())
    }
}

impl<'de> Deserialize<'de> for Anchor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keyword = String::deserialize(deserializer)?;
        Ok(Anchor::from_keyword(&keyword))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_map<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    })
}

fn lenient_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_i64()
        .unwrap_or_else(default_version))
}

/// A list maps item by item, a lone mapping counts as one component, null is empty.
fn lenient_components<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Component>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(Component::from).collect(),
        Value::Null => Vec::new(),
        other => vec![Component::from(other)],
    })
}

fn null_as_empty_object<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => empty_object(),
        other => other,
    })
}

fn null_as_group_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

/// Deterministic slide id from a title: `"Q1 Results: Revenue!"` → `"q1_results_revenue"`.
pub fn slugify(title: &str) -> String {
    let cleaned = NON_WORD.replace_all(title, "");
    let joined = SEPARATOR_RUN.replace_all(&cleaned, "_");
    joined.to_lowercase().trim_matches('_').to_string()
}
