//! Reshapes loosely structured input into the canonical `{version, meta, theme, slides}` IR.

use serde_json::{Map, Value, json};

use crate::error::DeckError;
use crate::ir::Presentation;

const AUTO_SLIDE_ID: &str = "auto_1";
const AUTO_SLIDE_BACKGROUND: &str = "#FFFFFF";

/// Normalizes a raw IR tree.
///
/// Accepted roots:
/// - a list of component-like mappings (first element has `tool`) → one synthetic slide;
/// - a list of slide-like mappings (first element has `components`) → the slides;
/// - any other list → one synthetic slide holding the list as components;
/// - a mapping without `slides` but with `components` → one synthetic slide;
/// - a canonical mapping → missing top-level keys defaulted, present keys untouched.
pub fn normalize(raw: Value) -> Result<Value, DeckError> {
    match raw {
        Value::Array(items) => Ok(normalize_list(items)),
        Value::Object(map) => Ok(Value::Object(normalize_map(map))),
        other => Err(DeckError::structural(format!(
            "IR must be a mapping or a list, got {}",
            value_kind(&other)
        ))),
    }
}

/// Normalizes and deserializes into the typed IR.
pub fn into_presentation(raw: Value) -> Result<Presentation, DeckError> {
    let canonical = normalize(raw)?;
    serde_json::from_value(canonical)
        .map_err(|err| DeckError::structural(format!("IR does not match the canonical shape: {err}")))
}

fn minimal(slides: Vec<Value>) -> Value {
    json!({
        "version": 1,
        "meta": {},
        "theme": {},
        "slides": slides,
    })
}

fn synthetic_slide(components: Vec<Value>) -> Value {
    json!({
        "id": AUTO_SLIDE_ID,
        "background": AUTO_SLIDE_BACKGROUND,
        "components": components,
    })
}

fn normalize_list(items: Vec<Value>) -> Value {
    let all_objects = !items.is_empty() && items.iter().all(Value::is_object);
    if all_objects {
        let first = items[0].as_object();
        let has = |key: &str| first.is_some_and(|obj| obj.contains_key(key));
        if has("tool") {
            return minimal(vec![synthetic_slide(items)]);
        }
        if has("components") {
            return minimal(items);
        }
    }
    minimal(vec![synthetic_slide(items)])
}

fn normalize_map(mut map: Map<String, Value>) -> Map<String, Value> {
    map.entry("version").or_insert_with(|| json!(1));
    map.entry("meta").or_insert_with(|| json!({}));
    map.entry("theme").or_insert_with(|| json!({}));

    if !map.contains_key("slides") {
        let slides = match map.get("components") {
            Some(components) => {
                let mut slide = Map::new();
                slide.insert(
                    "id".to_string(),
                    map.get("id").cloned().unwrap_or_else(|| json!(AUTO_SLIDE_ID)),
                );
                slide.insert(
                    "background".to_string(),
                    map.get("background")
                        .cloned()
                        .unwrap_or_else(|| json!(AUTO_SLIDE_BACKGROUND)),
                );
                slide.insert(
                    "layout".to_string(),
                    map.get("layout").cloned().unwrap_or(Value::Null),
                );
                slide.insert("components".to_string(), components.clone());
                vec![Value::Object(slide)]
            }
            None => Vec::new(),
        };
        map.insert("slides".to_string(), Value::Array(slides));
    }
    map
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
