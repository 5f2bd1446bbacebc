//! Loads an IR file into a JSON value tree.

use serde_json::Value;
use std::path::Path;

use crate::error::DeckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Yaml,
    Json,
    Json5,
}

impl InputFormat {
    /// Format implied by a file extension; `None` when the extension says nothing.
    pub fn from_path(path: &Path) -> Option<InputFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(InputFormat::Yaml),
            "json" => Some(InputFormat::Json),
            "json5" => Some(InputFormat::Json5),
            _ => None,
        }
    }
}

pub fn parse_ir_str(contents: &str, format: InputFormat) -> Result<Value, String> {
    match format {
        InputFormat::Yaml => serde_yaml::from_str(contents).map_err(|err| err.to_string()),
        InputFormat::Json => serde_json::from_str(contents).map_err(|err| err.to_string()),
        InputFormat::Json5 => json5::from_str(contents).map_err(|err| err.to_string()),
    }
}

/// Parses text of unknown format: JSON5 first (it accepts plain JSON), then YAML.
///
/// YAML goes last because it reads nearly any text as a bare scalar.
pub fn parse_ir_guess(contents: &str) -> Result<Value, String> {
    parse_ir_str(contents, InputFormat::Json5).or_else(|_| parse_ir_str(contents, InputFormat::Yaml))
}

pub fn load_ir_value(path: &Path) -> Result<Value, DeckError> {
    let contents = std::fs::read_to_string(path).map_err(|source| DeckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = InputFormat::from_path(path);
    tracing::debug!(path = %path.display(), ?format, "loading IR");
    let parsed = match format {
        Some(format) => parse_ir_str(&contents, format),
        None => parse_ir_guess(&contents),
    };
    parsed.map_err(|message| DeckError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
