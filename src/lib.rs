//! Syllabus - Course Transcript Question Answering
//!
//! A local-first CLI and library for asking questions about course
//! transcripts. Answers come from a generation model that can call search
//! tools over a semantic index of the course material.
//!
//! # Overview
//!
//! Syllabus allows you to:
//! - Ingest a folder of plain-text course transcripts
//! - Search course content semantically, scoped by course and lesson
//! - Ask questions and get answers with lesson-level citations
//! - Hold short multi-turn conversations about the material
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `document` - Course document parsing
//! - `chunking` - Sentence-aware chunking with overlap
//! - `embedding` - Embedding generation
//! - `vector_store` - Catalog and content index abstraction
//! - `retrieval` - Course resolution and scoped search
//! - `tools` - Tool registry and built-in search tools
//! - `generation` - Generation model abstraction
//! - `agent` - Bounded sequential tool-calling loop
//! - `session` - Bounded conversation history
//! - `orchestrator` - Ingestion and query pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use syllabus::config::Settings;
//! use syllabus::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.ingest_folder("./docs".as_ref(), false).await?;
//!     println!("Indexed {} courses", report.courses_added);
//!
//!     let response = orchestrator.query("What is covered in lesson 1?", None).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod openai;
pub mod orchestrator;
pub mod retrieval;
pub mod session;
pub mod tools;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, SyllabusError};
