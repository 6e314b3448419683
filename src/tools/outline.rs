//! Course outline tool.

use super::{Source, Tool, ToolError, ToolOutput};
use crate::document::Course;
use crate::error::SyllabusError;
use crate::retrieval::Retriever;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Returns a course's title, link, instructor and lesson list.
pub struct CourseOutlineTool {
    retriever: Arc<Retriever>,
}

impl CourseOutlineTool {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever }
    }
}

/// Render a course outline as plain text.
pub(crate) fn format_outline(course: &Course) -> String {
    let mut out = format!("Course Title: {}\n", course.title);
    if let Some(link) = &course.course_link {
        out.push_str(&format!("Course Link: {}\n", link));
    }
    if let Some(instructor) = &course.instructor {
        out.push_str(&format!("Course Instructor: {}\n", instructor));
    }

    out.push_str(&format!("Lessons ({}):\n", course.lessons.len()));
    for lesson in &course.lessons {
        out.push_str(&format!("Lesson {}: {}", lesson.lesson_number, lesson.title));
        if let Some(link) = &lesson.lesson_link {
            out.push_str(&format!(" ({})", link));
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn name(&self) -> &str {
        "get_course_outline"
    }

    fn description(&self) -> &str {
        "Get a course outline: title, course link, instructor and the complete lesson list"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                }
            },
            "required": ["course_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let name = args["course_name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("course_name must be a string".to_string()))?;

        let course = self
            .retriever
            .outline(name)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(match course {
            Some(course) => ToolOutput {
                content: format_outline(&course),
                sources: vec![Source {
                    label: course.title.clone(),
                    link: course.course_link.clone(),
                }],
            },
            None => ToolOutput::text(SyllabusError::Resolution(name.to_string()).to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Lesson;
    use crate::retrieval::LexicalResolver;
    use crate::testing::index_fixture;

    async fn tool() -> CourseOutlineTool {
        let (store, embedder) = index_fixture().await;
        let resolver = Arc::new(LexicalResolver::new(store.clone()));
        CourseOutlineTool::new(Arc::new(Retriever::new(store, embedder, resolver)))
    }

    #[tokio::test]
    async fn test_outline_lists_lessons() {
        let output = tool()
            .await
            .execute(json!({"course_name": "intro to x"}))
            .await
            .unwrap();

        assert!(output.content.starts_with("Course Title: Intro to X\n"));
        assert!(output.content.contains("Course Link: https://example.com/x"));
        assert!(output.content.contains("Lesson 1: Getting Started (https://example.com/x/1)"));
        assert!(output.content.contains("Lesson 2: Going Further"));
        assert_eq!(output.sources[0].label, "Intro to X");
    }

    #[tokio::test]
    async fn test_outline_unknown_course() {
        let output = tool()
            .await
            .execute(json!({"course_name": "Intro to Zzz"}))
            .await
            .unwrap();

        assert_eq!(output.content, "No course found matching 'Intro to Zzz'");
        assert_eq!(
            output.content,
            SyllabusError::Resolution("Intro to Zzz".to_string()).to_string()
        );
        assert!(output.sources.is_empty());
    }

    #[test]
    fn test_format_outline_skips_missing_fields() {
        let course = Course {
            title: "Bare".to_string(),
            course_link: None,
            instructor: None,
            lessons: vec![
                Lesson {
                    lesson_number: 0,
                    title: "Intro".to_string(),
                    lesson_link: None,
                },
                Lesson {
                    lesson_number: 1,
                    title: "Next".to_string(),
                    lesson_link: Some("https://example.com/bare/1".to_string()),
                },
            ],
        };

        assert_eq!(
            format_outline(&course),
            "Course Title: Bare\nLessons (2):\nLesson 0: Intro\nLesson 1: Next (https://example.com/bare/1)"
        );
    }
}
