//! Content chunking for breaking course documents into searchable segments.
//!
//! Documents are split into sentences and greedily packed into bounded
//! chunks, with a small overlap carried between neighbouring chunks of the
//! same lesson.

mod sentence;

pub use sentence::SentenceChunker;

use crate::config::ChunkingSettings;
use serde::{Deserialize, Serialize};

/// A chunk of content from a course document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Title of the owning course.
    pub course_title: String,
    /// Owning lesson, `None` for text outside any lesson.
    pub lesson_number: Option<u32>,
    /// Position of this chunk within the course, starting at 0.
    pub chunk_index: usize,
    /// Text content of this chunk.
    pub content: String,
    /// Number of leading characters seeded from the previous chunk,
    /// including the joining space.
    pub overlap_chars: usize,
}

impl Chunk {
    /// Display label, e.g. `Intro_to_X_3`. Not unique across courses whose
    /// titles differ only by spaces and underscores; stores key chunks by
    /// `(course_title, chunk_index)`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.course_title.replace(' ', "_"), self.chunk_index)
    }

    /// Content with the seeded overlap removed.
    pub fn fresh_content(&self) -> String {
        self.content.chars().skip(self.overlap_chars).collect()
    }

    /// Length of the content in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub max_size: usize,
    /// Overlap carried into the next chunk, in characters.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_size: 800,
            overlap: 100,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            max_size: settings.chunk_size.max(1),
            overlap: settings.chunk_overlap,
        }
    }
}
