//! Error types for yt-harvest.

use thiserror::Error;

/// Library-level error type for yt-harvest operations.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unrecognized URL shape: {0}")]
    Classification(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),
}

impl HarvestError {
    /// Stable machine-readable name for this error, used in tool results.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::InvalidInput(_) => "invalid_input",
            HarvestError::Classification(_) => "classification",
            HarvestError::NotFound(_) => "not_found",
            HarvestError::Extraction(_) => "extraction",
            HarvestError::Store(_) | HarvestError::Database(_) => "store",
            HarvestError::Config(_) | HarvestError::TomlParse(_) => "config",
            HarvestError::Io(_) => "io",
            HarvestError::Json(_) => "serialization",
            HarvestError::ToolNotFound(_) => "tool_not_found",
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only extraction failures are considered transient. Bad input, missing
    /// videos and a missing `yt-dlp` binary fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, HarvestError::Extraction(_))
    }
}

/// Result type alias for yt-harvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;
