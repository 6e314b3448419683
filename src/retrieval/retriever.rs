//! Scoped semantic search over course content.

use super::{CourseResolver, Resolution, SearchHit, SearchOutcome, Source};
use crate::document::Course;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{ContentFilter, VectorStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Retriever over the catalog and content collections.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    resolver: Arc<dyn CourseResolver>,
    max_results: usize,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        resolver: Arc<dyn CourseResolver>,
    ) -> Self {
        Self {
            store,
            embedder,
            resolver,
            max_results: 5,
        }
    }

    /// Set the default number of results.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Resolve a free-text course name.
    pub async fn resolve_course(&self, name: &str) -> Result<Resolution> {
        self.resolver.resolve(name).await
    }

    /// Search course content.
    ///
    /// A `course_filter` that resolves to no course yields
    /// [`SearchOutcome::CourseNotFound`] rather than unscoped results.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        course_filter: Option<&str>,
        lesson_filter: Option<u32>,
        limit: Option<usize>,
    ) -> Result<SearchOutcome> {
        let course_title = match course_filter {
            Some(name) => match self.resolver.resolve(name).await? {
                Resolution::NotFound => {
                    debug!("No course matched '{}'", name);
                    return Ok(SearchOutcome::CourseNotFound(name.to_string()));
                }
                resolved => resolved.title().map(str::to_string),
            },
            None => None,
        };

        let filter = ContentFilter {
            course_title,
            lesson_number: lesson_filter,
        };

        let embedding = self.embedder.embed(query).await?;
        let matches = self
            .store
            .query_content(&embedding, &filter, limit.unwrap_or(self.max_results))
            .await?;

        let mut courses: HashMap<String, Option<Course>> = HashMap::new();
        let mut hits = Vec::with_capacity(matches.len());

        for m in matches {
            let title = m.chunk.course_title.clone();
            if !courses.contains_key(&title) {
                let course = self.store.get_course(&title).await?;
                courses.insert(title.clone(), course);
            }

            let course = courses.get(&title).and_then(Option::as_ref);
            hits.push(SearchHit {
                source: Source::for_lesson(&title, m.chunk.lesson_number, course),
                chunk: m.chunk,
                score: m.score,
            });
        }

        debug!("Search for '{}' returned {} hits", query, hits.len());
        Ok(SearchOutcome::Results(hits))
    }

    /// Resolve a course and return its catalog metadata.
    #[instrument(skip(self))]
    pub async fn outline(&self, course_filter: &str) -> Result<Option<Course>> {
        match self.resolver.resolve(course_filter).await?.title() {
            Some(title) => self.store.get_course(title).await,
            None => Ok(None),
        }
    }

    /// All course titles in the catalog.
    pub async fn course_titles(&self) -> Result<Vec<String>> {
        self.store.course_titles().await
    }
}
