//! Error types for Syllabus.

use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for Syllabus operations.
#[derive(Error, Debug)]
pub enum SyllabusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to ingest {}: {reason}", .path.display())]
    Ingestion { path: PathBuf, reason: String },

    #[error("No course found matching '{0}'")]
    Resolution(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Tool rounds exhausted with unanswered tool requests")]
    OrchestrationExhausted,

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SyllabusError {
    /// Build an ingestion error for a single document.
    pub fn ingestion(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SyllabusError::Ingestion {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Syllabus operations.
pub type Result<T> = std::result::Result<T, SyllabusError>;
