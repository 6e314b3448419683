//! Course documents and their catalog metadata.
//!
//! A course document is a plain-text transcript with a small header and
//! inline lesson markers. Parsing yields the [`Course`] metadata for the
//! catalog plus the lesson-free body text and the offsets where each lesson
//! begins, which is what the chunker consumes.

mod parser;
mod source;

pub use parser::parse_course_document;
pub use source::{is_course_file, list_course_files, load_course_file};

use serde::{Deserialize, Serialize};

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number, unique within its course.
    pub lesson_number: u32,
    /// Lesson title.
    pub title: String,
    /// Link to the lesson source, if known.
    pub lesson_link: Option<String>,
}

/// Course metadata, identified by its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course title (unique, case-sensitive).
    pub title: String,
    /// Link to the course page, if known.
    pub course_link: Option<String>,
    /// Course instructor, if known.
    pub instructor: Option<String>,
    /// Lessons in document order.
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Create a course with no lessons.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            course_link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    /// Look up a lesson by number.
    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.lesson_number == lesson_number)
    }

    /// Source link for a lesson, falling back to the course link.
    pub fn link_for(&self, lesson_number: Option<u32>) -> Option<String> {
        lesson_number
            .and_then(|n| self.lesson(n))
            .and_then(|l| l.lesson_link.clone())
            .or_else(|| self.course_link.clone())
    }
}

/// Position in a document body where a lesson starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonBoundary {
    /// Byte offset into the body text.
    pub offset: usize,
    /// Lesson that starts at this offset.
    pub lesson_number: u32,
}

/// A parsed course document ready for chunking.
#[derive(Debug, Clone)]
pub struct CourseDocument {
    /// Catalog metadata.
    pub course: Course,
    /// Body text with header and lesson marker lines removed.
    pub body: String,
    /// Lesson boundaries in ascending offset order.
    pub boundaries: Vec<LessonBoundary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_for_falls_back_to_course_link() {
        let mut course = Course::new("Intro to X");
        course.course_link = Some("https://example.com/x".to_string());
        course.lessons.push(Lesson {
            lesson_number: 1,
            title: "Basics".to_string(),
            lesson_link: Some("https://example.com/x/1".to_string()),
        });
        course.lessons.push(Lesson {
            lesson_number: 2,
            title: "More".to_string(),
            lesson_link: None,
        });

        assert_eq!(course.link_for(Some(1)).as_deref(), Some("https://example.com/x/1"));
        assert_eq!(course.link_for(Some(2)).as_deref(), Some("https://example.com/x"));
        assert_eq!(course.link_for(None).as_deref(), Some("https://example.com/x"));
    }
}
