//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    rank_catalog, rank_content, CatalogEntry, CatalogMatch, ContentFilter,
    ContentMatch, IndexedChunk, Scorer, VectorStore,
};
use crate::document::Course;
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

fn lock_error<T>(e: PoisonError<T>) -> SyllabusError {
    SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e))
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    courses: RwLock<BTreeMap<String, CatalogEntry>>,
    chunks: RwLock<HashMap<(String, usize), IndexedChunk>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(BTreeMap::new()),
            chunks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_course(&self, entry: &CatalogEntry) -> Result<()> {
        let mut courses = self.courses.write().map_err(lock_error)?;
        courses.insert(entry.course.title.clone(), entry.clone());
        Ok(())
    }

    async fn query_catalog(&self, embedding: &[f32], limit: usize) -> Result<Vec<CatalogMatch>> {
        let courses = self.courses.read().map_err(lock_error)?;

        let mut scorer = Scorer::new(embedding);
        let mut results: Vec<CatalogMatch> = courses
            .values()
            .map(|entry| CatalogMatch {
                course: entry.course.clone(),
                score: scorer.score(&entry.embedding),
            })
            .collect();
        scorer.finish("catalog");

        rank_catalog(&mut results, limit);
        Ok(results)
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let courses = self.courses.read().map_err(lock_error)?;
        Ok(courses.get(title).map(|entry| entry.course.clone()))
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let courses = self.courses.read().map_err(lock_error)?;
        Ok(courses.keys().cloned().collect())
    }

    async fn course_count(&self) -> Result<usize> {
        Ok(self.courses.read().map_err(lock_error)?.len())
    }

    async fn upsert_chunks(&self, chunks: &[IndexedChunk]) -> Result<usize> {
        let mut store = self.chunks.write().map_err(lock_error)?;
        for indexed in chunks {
            let key = (indexed.chunk.course_title.clone(), indexed.chunk.chunk_index);
            store.insert(key, indexed.clone());
        }
        Ok(chunks.len())
    }

    async fn query_content(
        &self,
        embedding: &[f32],
        filter: &ContentFilter,
        limit: usize,
    ) -> Result<Vec<ContentMatch>> {
        let chunks = self.chunks.read().map_err(lock_error)?;

        let mut scorer = Scorer::new(embedding);
        let mut results: Vec<ContentMatch> = chunks
            .values()
            .filter(|indexed| filter.matches(&indexed.chunk))
            .map(|indexed| ContentMatch {
                chunk: indexed.chunk.clone(),
                score: scorer.score(&indexed.embedding),
            })
            .collect();
        scorer.finish("content");

        rank_content(&mut results, limit);
        Ok(results)
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.chunks.read().map_err(lock_error)?.len())
    }

    async fn clear(&self) -> Result<()> {
        self.courses.write().map_err(lock_error)?.clear();
        self.chunks.write().map_err(lock_error)?.clear();
        Ok(())
    }
}
