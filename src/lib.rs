#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod document;
pub mod dump;
pub mod error;
pub mod input;
pub mod ir;
pub mod layout;
pub mod normalize;
pub mod orchestrator;
pub mod render;
pub mod text_metrics;
pub mod theme;
pub mod tools;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::Config;
pub use error::{ComponentError, DeckError};
pub use ir::Presentation;
pub use orchestrator::{RenderedDeck, render_presentation};
pub use tools::ToolRegistry;

use serde_json::Value;
use std::path::Path;

/// Normalizes a raw IR tree and renders it with the built-in tools.
pub fn render_value(raw: Value, config: &Config) -> Result<(Presentation, RenderedDeck), DeckError> {
    let presentation = normalize::into_presentation(raw)?;
    let deck = render_presentation(&presentation, &ToolRegistry::builtin(), config)?;
    Ok((presentation, deck))
}

/// [`render_value`] on an IR file.
pub fn render_file(path: &Path, config: &Config) -> Result<(Presentation, RenderedDeck), DeckError> {
    render_value(input::load_ir_value(path)?, config)
}
