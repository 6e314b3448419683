//! Course content search tool.

use super::{merge_sources, Tool, ToolError, ToolOutput};
use crate::error::SyllabusError;
use crate::retrieval::{Retriever, SearchOutcome};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Searches course materials with optional course and lesson filters.
pub struct SearchCourseContentTool {
    retriever: Arc<Retriever>,
}

impl SearchCourseContentTool {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever }
    }

    fn empty_message(args: &SearchArgs) -> String {
        let mut message = "No relevant content found".to_string();
        if let Some(course) = &args.course_name {
            message.push_str(&format!(" in course '{}'", course));
        }
        if let Some(lesson) = args.lesson_number {
            message.push_str(&format!(" in lesson {}", lesson));
        }
        message.push('.');
        message
    }
}

#[async_trait]
impl Tool for SearchCourseContentTool {
    fn name(&self) -> &str {
        "search_course_content"
    }

    fn description(&self) -> &str {
        "Search course materials with smart course name matching and lesson filtering"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for in the course content"
                },
                "course_name": {
                    "type": "string",
                    "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                },
                "lesson_number": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let args: SearchArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let outcome = self
            .retriever
            .search(
                &args.query,
                args.course_name.as_deref(),
                args.lesson_number,
                None,
            )
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let hits = match outcome {
            SearchOutcome::CourseNotFound(name) => {
                return Ok(ToolOutput::text(SyllabusError::Resolution(name).to_string()))
            }
            SearchOutcome::Results(hits) if hits.is_empty() => {
                return Ok(ToolOutput::text(Self::empty_message(&args)))
            }
            SearchOutcome::Results(hits) => hits,
        };

        let content = hits
            .iter()
            .map(|hit| format!("[{}]\n{}", hit.source.label, hit.chunk.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut sources = Vec::new();
        merge_sources(&mut sources, hits.into_iter().map(|hit| hit.source));

        Ok(ToolOutput { content, sources })
    }
}
