use crate::document::Shape;
use crate::error::DeckError;
use crate::ir::Meta;
use crate::orchestrator::{RenderReport, RenderedDeck, SlideRegistry};
use crate::theme::{Rgb, Theme};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Serializable view of a rendered deck: the shape tree of every slide next to
/// its component registry, plus the render report.
#[derive(Debug, Serialize)]
pub struct DeckDump<'a> {
    pub meta: &'a Meta,
    /// Slide size in EMU.
    pub width: i64,
    pub height: i64,
    pub theme: &'a Theme,
    pub slides: Vec<SlideDump<'a>>,
    pub report: &'a RenderReport,
}

#[derive(Debug, Serialize)]
pub struct SlideDump<'a> {
    /// 1-based.
    pub index: usize,
    pub id: &'a str,
    pub background: Rgb,
    pub shapes: &'a [Shape],
    pub registry: &'a SlideRegistry,
}

impl<'a> DeckDump<'a> {
    pub fn from_deck(deck: &'a RenderedDeck, meta: &'a Meta) -> Self {
        let slides = deck
            .document
            .slides
            .iter()
            .zip(&deck.slides)
            .enumerate()
            .map(|(idx, (canvas, rendered))| SlideDump {
                index: idx + 1,
                id: rendered.slide_id.as_str(),
                background: canvas.background,
                shapes: canvas.shapes.as_slice(),
                registry: &rendered.registry,
            })
            .collect();
        Self {
            meta,
            width: deck.document.width,
            height: deck.document.height,
            theme: &deck.theme,
            slides,
            report: &deck.report,
        }
    }
}

pub fn dump_to_string(deck: &RenderedDeck, meta: &Meta) -> Result<String, DeckError> {
    serde_json::to_string_pretty(&DeckDump::from_deck(deck, meta))
        .map_err(|err| DeckError::Output(format!("failed to serialize deck: {err}")))
}

pub fn write_deck_dump(path: &Path, deck: &RenderedDeck, meta: &Meta) -> Result<(), DeckError> {
    let file = File::create(path).map_err(|source| DeckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &DeckDump::from_deck(deck, meta))
        .map_err(|err| DeckError::Output(format!("failed to write {}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::normalize::into_presentation;
    use crate::orchestrator::render_presentation;
    use crate::tools::ToolRegistry;
    use serde_json::{Value, json};

    #[test]
    fn dump_pairs_shapes_with_registry() {
        let pres = into_presentation(json!({
            "meta": {"title": "Deck"},
            "slides": [{"title": "Intro", "components": [
                {"tool": "main_message", "id": "msg", "data": {"main_message": "Ship it"}},
                {"tool": "nope"}
            ]}]
        }))
        .unwrap();
        let deck = render_presentation(&pres, &ToolRegistry::builtin(), &Config::default()).unwrap();
        let text = dump_to_string(&deck, &pres.meta).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["meta"]["title"], json!("Deck"));
        assert_eq!(value["width"], json!(9_144_000));
        let slide = &value["slides"][0];
        assert_eq!(slide["id"], json!("intro"));
        assert_eq!(slide["background"], json!("#FFFFFF"));
        assert_eq!(slide["registry"]["msg"]["tool"], json!("main_message"));
        assert_eq!(slide["registry"]["msg"]["is_group"], json!(true));
        assert!(slide["registry"]["auto_title"].is_object());
        assert_eq!(slide["shapes"][0]["kind"]["type"], json!("group"));
        assert_eq!(value["report"]["skipped"][0]["kind"], json!("lookup"));
    }
}
