use std::path::PathBuf;

/// Errors that abort a whole render run.
#[derive(thiserror::Error, Debug)]
pub enum DeckError {
    /// The IR root is neither a list nor a mapping, or does not fit the canonical shape.
    #[error("structural error: {0}")]
    Structural(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input file could not be parsed as YAML/JSON/JSON5.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("output error: {0}")]
    Output(String),
}

impl DeckError {
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }
}

/// Errors local to a single component. The orchestrator logs these and moves on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    #[error("component has no tool name")]
    MissingTool,

    #[error("tool '{tool}' not found")]
    Lookup { tool: String },

    #[error("schema validation failed for tool '{tool}': {message}")]
    Validation { tool: String, message: String },

    #[error("tool '{tool}' failed to render: {message}")]
    Render { tool: String, message: String },
}

impl ComponentError {
    /// Short tag used in reports and dumps.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingTool => "missing_tool",
            Self::Lookup { .. } => "lookup",
            Self::Validation { .. } => "validation",
            Self::Render { .. } => "render",
        }
    }
}

/// Error returned by a tool renderer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub type ToolResult = Result<(), ToolError>;
