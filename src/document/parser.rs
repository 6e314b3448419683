//! Parser for plain-text course documents.
//!
//! Expected layout:
//!
//! ```text
//! Course Title: Intro to X
//! Course Link: https://example.com/x
//! Course Instructor: Jane Doe
//!
//! Lesson 1: Getting Started
//! Lesson Link: https://example.com/x/1
//! Lesson text...
//! ```

use super::{Course, CourseDocument, Lesson, LessonBoundary};
use crate::error::{Result, SyllabusError};
use regex::Regex;
use std::sync::OnceLock;

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*course\s+(title|link|instructor)\s*:\s*(.*?)\s*$")
            .unwrap_or_else(|e| panic!("invalid header regex: {e}"))
    })
}

fn lesson_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*lesson\s+(\d+)\s*:\s*(.*?)\s*$")
            .unwrap_or_else(|e| panic!("invalid lesson regex: {e}"))
    })
}

fn lesson_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*lesson\s+link\s*:\s*(.*?)\s*$")
            .unwrap_or_else(|e| panic!("invalid lesson link regex: {e}"))
    })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse a course document.
///
/// `fallback_title` is used when the document has no `Course Title:` header.
pub fn parse_course_document(text: &str, fallback_title: &str) -> Result<CourseDocument> {
    let mut course = Course::new(String::new());
    let mut body = String::with_capacity(text.len());
    let mut boundaries: Vec<LessonBoundary> = Vec::new();
    let mut in_header = true;
    let mut expect_lesson_link = false;

    for line in text.lines() {
        if in_header {
            if let Some(caps) = header_regex().captures(line) {
                let value = non_empty(&caps[2]);
                match caps[1].to_lowercase().as_str() {
                    "title" => course.title = value.unwrap_or_default(),
                    "link" => course.course_link = value,
                    _ => course.instructor = value,
                }
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            in_header = false;
        }

        if let Some(caps) = lesson_regex().captures(line) {
            let lesson_number: u32 = caps[1].parse().map_err(|_| {
                SyllabusError::InvalidInput(format!("Lesson number out of range: {}", &caps[1]))
            })?;

            if course.lesson(lesson_number).is_some() {
                return Err(SyllabusError::InvalidInput(format!(
                    "Duplicate lesson {} in course '{}'",
                    lesson_number,
                    if course.title.is_empty() { fallback_title } else { &course.title }
                )));
            }

            course.lessons.push(Lesson {
                lesson_number,
                title: caps[2].to_string(),
                lesson_link: None,
            });
            boundaries.push(LessonBoundary {
                offset: body.len(),
                lesson_number,
            });
            expect_lesson_link = true;
            continue;
        }

        if expect_lesson_link {
            expect_lesson_link = false;
            if let Some(caps) = lesson_link_regex().captures(line) {
                if let Some(lesson) = course.lessons.last_mut() {
                    lesson.lesson_link = non_empty(&caps[1]);
                }
                continue;
            }
        }

        body.push_str(line);
        body.push('\n');
    }

    if course.title.is_empty() {
        course.title = fallback_title.trim().to_string();
    }

    if course.title.is_empty() {
        return Err(SyllabusError::InvalidInput(
            "Course document has no title".to_string(),
        ));
    }

    if body.trim().is_empty() {
        return Err(SyllabusError::InvalidInput(format!(
            "Course '{}' has no content",
            course.title
        )));
    }

    Ok(CourseDocument {
        course,
        body,
        boundaries,
    })
}
