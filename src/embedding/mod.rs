//! Embedding generation for semantic search and retrieval.

mod hashed;
mod openai;

pub use hashed::HashedEmbedder;
pub(crate) use hashed::terms;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, Settings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Create the embedder selected in settings.
pub fn create_embedder(settings: &Settings) -> Arc<dyn Embedder> {
    match settings.embedding.provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::new(&settings.llm, &settings.embedding)),
        EmbeddingProvider::Hashed => {
            Arc::new(HashedEmbedder::new(settings.embedding.dimensions as usize))
        }
    }
}
