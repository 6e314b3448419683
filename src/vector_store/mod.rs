//! Vector store abstraction for Syllabus.
//!
//! The index holds two collections: a course catalog (one entry per course,
//! embedded by title) used to resolve fuzzy course names, and the content
//! collection of embedded chunks that searches run against.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::config::Settings;
use crate::document::Course;
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::warn;

/// A course in the catalog with its title embedding.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Course metadata.
    pub course: Course,
    /// Embedding of the course title.
    pub embedding: Vec<f32>,
    /// When the course was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn new(course: Course, embedding: Vec<f32>) -> Self {
        Self {
            course,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A chunk stored in the content collection.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// The chunk itself.
    pub chunk: Chunk,
    /// Embedding of the chunk content.
    pub embedding: Vec<f32>,
}

/// A catalog hit with score.
#[derive(Debug, Clone)]
pub struct CatalogMatch {
    /// The matched course.
    pub course: Course,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// A content hit with score.
#[derive(Debug, Clone)]
pub struct ContentMatch {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Restricts a content query to a course and/or lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    /// Exact course title.
    pub course_title: Option<String>,
    /// Lesson number within the course.
    pub lesson_number: Option<u32>,
}

impl ContentFilter {
    /// Whether a chunk passes the filter.
    pub fn matches(&self, chunk: &Chunk) -> bool {
        self.course_title
            .as_deref()
            .map_or(true, |title| chunk.course_title == title)
            && self
                .lesson_number
                .map_or(true, |n| chunk.lesson_number == Some(n))
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add or replace a course in the catalog.
    async fn upsert_course(&self, entry: &CatalogEntry) -> Result<()>;

    /// Rank catalog entries by title similarity.
    async fn query_catalog(&self, embedding: &[f32], limit: usize) -> Result<Vec<CatalogMatch>>;

    /// Get a course by exact title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// All course titles, sorted.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Number of courses in the catalog.
    async fn course_count(&self) -> Result<usize>;

    /// Add or replace chunks in the content collection.
    async fn upsert_chunks(&self, chunks: &[IndexedChunk]) -> Result<usize>;

    /// Rank chunks passing `filter` by similarity to `embedding`.
    async fn query_content(
        &self,
        embedding: &[f32],
        filter: &ContentFilter,
        limit: usize,
    ) -> Result<Vec<ContentMatch>>;

    /// Number of chunks in the content collection.
    async fn chunk_count(&self) -> Result<usize>;

    /// Remove everything from both collections.
    async fn clear(&self) -> Result<()>;
}

/// Create the vector store selected in settings.
pub fn create_vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider.to_lowercase().as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(SyllabusError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Scores stored vectors against one query vector.
///
/// Vectors of a different length score 0.0 and are reported once per query.
pub(crate) struct Scorer<'a> {
    query: &'a [f32],
    mismatched: usize,
}

impl<'a> Scorer<'a> {
    pub(crate) fn new(query: &'a [f32]) -> Self {
        Self {
            query,
            mismatched: 0,
        }
    }

    pub(crate) fn score(&mut self, stored: &[f32]) -> f32 {
        if stored.len() != self.query.len() {
            self.mismatched += 1;
        }
        cosine_similarity(self.query, stored)
    }

    /// Log any dimension mismatches and return how many there were.
    pub(crate) fn finish(self, collection: &str) -> usize {
        if self.mismatched > 0 {
            warn!(
                "{} {} vectors do not have the query's {} dimensions; re-ingest with --clear",
                self.mismatched,
                collection,
                self.query.len()
            );
        }
        self.mismatched
    }
}

/// Order content hits: score descending, then chunk index, then course title.
pub(crate) fn rank_content(results: &mut Vec<ContentMatch>, limit: usize) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
            .then_with(|| a.chunk.course_title.cmp(&b.chunk.course_title))
    });
    results.truncate(limit);
}

/// Order catalog hits: score descending, then title.
pub(crate) fn rank_catalog(results: &mut Vec<CatalogMatch>, limit: usize) {
    results.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.course.title.cmp(&b.course.title),
        other => other,
    });
    results.truncate(limit);
}
