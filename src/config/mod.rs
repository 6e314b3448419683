//! Configuration module for Syllabus.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    AgentSettings, ChunkingSettings, ClosingPolicy, DocumentSettings, EmbeddingProvider,
    EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings, ResolverKind,
    RetrievalSettings, SessionSettings, Settings, VectorStoreSettings,
};
