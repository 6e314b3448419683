//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::{EmbeddingProvider, Settings};
use crate::error::{Result, SyllabusError};
use crate::openai::has_api_key;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions calls the chat model.
    Ask,
    /// Ingestion and search only need embeddings.
    Index,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    let needs_key = match operation {
        Operation::Ask => true,
        Operation::Index => settings.embedding.provider == EmbeddingProvider::OpenAI,
    };

    if needs_key {
        check_api_key(settings)?;
    }
    Ok(())
}

/// Check if the API key variable is set.
fn check_api_key(settings: &Settings) -> Result<()> {
    if has_api_key(&settings.llm) {
        return Ok(());
    }

    let var = &settings.llm.api_key_env;
    Err(SyllabusError::Config(format!(
        "{} is not set. Set it with: export {}='sk-...'",
        var, var
    )))
}
