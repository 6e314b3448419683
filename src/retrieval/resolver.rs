//! Course name resolution.

use super::Resolution;
use crate::config::{ResolverKind, RetrievalSettings};
use crate::embedding::{terms, Embedder};
use crate::error::Result;
use crate::vector_store::VectorStore;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolves a free-text course name to a catalog title.
#[async_trait]
pub trait CourseResolver: Send + Sync {
    /// Resolve `name` against the catalog.
    async fn resolve(&self, name: &str) -> Result<Resolution>;
}

/// Create the resolver selected in settings.
pub fn create_resolver(
    settings: &RetrievalSettings,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
) -> Arc<dyn CourseResolver> {
    match settings.resolver {
        ResolverKind::Semantic => Arc::new(
            SemanticResolver::new(store, embedder).with_min_score(settings.min_course_score),
        ),
        ResolverKind::Lexical => {
            Arc::new(LexicalResolver::new(store).with_min_score(settings.min_course_score))
        }
    }
}

/// Pick a course from scored candidates.
///
/// Exact titles win (case-sensitive, then case-insensitive). Otherwise the
/// highest score at or above `min_score` wins, ties going to the smallest
/// title.
pub(crate) fn select_course(name: &str, candidates: &[(String, f32)], min_score: f32) -> Resolution {
    let name = name.trim();

    if let Some((title, _)) = candidates.iter().find(|(title, _)| title == name) {
        return Resolution::Exact(title.clone());
    }

    let folded = name.to_lowercase();
    if let Some(title) = candidates
        .iter()
        .map(|(title, _)| title)
        .filter(|title| title.to_lowercase() == folded)
        .min()
    {
        return Resolution::Exact(title.clone());
    }

    candidates
        .iter()
        .filter(|(_, score)| *score >= min_score)
        .max_by(|(ta, sa), (tb, sb)| sa.total_cmp(sb).then_with(|| tb.cmp(ta)))
        .map(|(title, score)| Resolution::Matched {
            title: title.clone(),
            score: *score,
        })
        .unwrap_or(Resolution::NotFound)
}

/// Resolves names by embedding similarity to course titles.
pub struct SemanticResolver {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl SemanticResolver {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            min_score: 0.6,
        }
    }

    /// Set the confidence floor.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }
}

#[async_trait]
impl CourseResolver for SemanticResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, name: &str) -> Result<Resolution> {
        let total = self.store.course_count().await?;
        if total == 0 || name.trim().is_empty() {
            return Ok(Resolution::NotFound);
        }

        let embedding = self.embedder.embed(name).await?;
        let candidates: Vec<(String, f32)> = self
            .store
            .query_catalog(&embedding, total)
            .await?
            .into_iter()
            .map(|m| (m.course.title, m.score))
            .collect();

        let resolution = select_course(name, &candidates, self.min_score);
        debug!("Resolved '{}' to {:?}", name, resolution);
        Ok(resolution)
    }
}

/// Resolves names by term overlap with course titles. Needs no embeddings.
pub struct LexicalResolver {
    store: Arc<dyn VectorStore>,
    min_score: f32,
}

impl LexicalResolver {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            min_score: 0.6,
        }
    }

    /// Set the confidence floor.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Share of query terms found in the title, nudged by term-set Dice.
    fn score(query: &HashSet<String>, title: &str) -> f32 {
        let title: HashSet<String> = terms(title).collect();
        if query.is_empty() || title.is_empty() {
            return 0.0;
        }

        let shared = query.intersection(&title).count() as f32;
        let coverage = shared / query.len() as f32;
        let dice = 2.0 * shared / (query.len() + title.len()) as f32;
        0.9 * coverage + 0.1 * dice
    }
}

#[async_trait]
impl CourseResolver for LexicalResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, name: &str) -> Result<Resolution> {
        let query: HashSet<String> = terms(name).collect();
        let candidates: Vec<(String, f32)> = self
            .store
            .course_titles()
            .await?
            .into_iter()
            .map(|title| {
                let score = Self::score(&query, &title);
                (title, score)
            })
            .collect();

        let resolution = select_course(name, &candidates, self.min_score);
        debug!("Resolved '{}' to {:?}", name, resolution);
        Ok(resolution)
    }
}
