//! Two-stage retrieval over the course index.
//!
//! A free-text course name is first resolved against the catalog, then the
//! content search runs scoped to the resolved title and optional lesson.

mod resolver;
mod retriever;

pub use resolver::{create_resolver, CourseResolver, LexicalResolver, SemanticResolver};
pub use retriever::Retriever;

use crate::chunking::Chunk;
use crate::document::Course;
use serde::{Deserialize, Serialize};

/// Citation for a piece of retrieved content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// `"<course> - Lesson <n>"`, or just the course title.
    pub label: String,
    /// Lesson link, or course link when the lesson has none.
    pub link: Option<String>,
}

impl Source {
    /// Build the citation for a chunk of `course`.
    pub fn for_lesson(course_title: &str, lesson_number: Option<u32>, course: Option<&Course>) -> Self {
        let label = match lesson_number {
            Some(n) => format!("{} - Lesson {}", course_title, n),
            None => course_title.to_string(),
        };

        Self {
            label,
            link: course.and_then(|c| c.link_for(lesson_number)),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.link {
            Some(link) => write!(f, "{} ({})", self.label, link),
            None => write!(f, "{}", self.label),
        }
    }
}

/// A ranked content hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (higher is better).
    pub score: f32,
    /// Citation for the chunk.
    pub source: Source,
}

/// Result of a scoped search.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Ranked hits, possibly empty.
    Results(Vec<SearchHit>),
    /// The course filter matched no course.
    CourseNotFound(String),
}

/// Result of resolving a free-text course name.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The name equals a title (case-insensitively at worst).
    Exact(String),
    /// Best fuzzy match at or above the confidence floor.
    Matched { title: String, score: f32 },
    /// Nothing scored at or above the floor.
    NotFound,
}

impl Resolution {
    /// Resolved course title, if any.
    pub fn title(&self) -> Option<&str> {
        match self {
            Resolution::Exact(title) | Resolution::Matched { title, .. } => Some(title),
            Resolution::NotFound => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_labels() {
        let mut course = Course::new("Intro to X");
        course.course_link = Some("https://example.com/x".to_string());

        let lesson = Source::for_lesson("Intro to X", Some(2), Some(&course));
        assert_eq!(lesson.label, "Intro to X - Lesson 2");
        assert_eq!(lesson.link.as_deref(), Some("https://example.com/x"));

        let whole = Source::for_lesson("Intro to X", None, None);
        assert_eq!(whole.label, "Intro to X");
        assert_eq!(whole.link, None);
        assert_eq!(whole.to_string(), "Intro to X");
    }

    #[test]
    fn test_resolution_title() {
        assert_eq!(Resolution::Exact("A".to_string()).title(), Some("A"));
        assert_eq!(
            Resolution::Matched {
                title: "B".to_string(),
                score: 0.8
            }
            .title(),
            Some("B")
        );
        assert_eq!(Resolution::NotFound.title(), None);
    }
}
