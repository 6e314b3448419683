//! Tool registry for model tool calling.
//!
//! Tools are registered once at startup under a fixed name and looked up at
//! invocation time. Raw model arguments are parsed and checked against the
//! tool's JSON schema before the handler runs, so malformed calls fail fast
//! with a structured [`ToolError`].

mod outline;
mod schema;
mod search;

pub use crate::retrieval::Source;
pub use outline::CourseOutlineTool;
pub(crate) use outline::format_outline;
pub use schema::validate_arguments;
pub use search::SearchCourseContentTool;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors raised while invoking a tool.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("{0}")]
    Execution(String),

    #[error("Tool task aborted: {0}")]
    Aborted(String),
}

/// Text returned to the model plus the citations behind it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Text fed back to the model as the tool result.
    pub content: String,
    /// Citations for the content, de-duplicated in order.
    pub sources: Vec<Source>,
}

impl ToolOutput {
    /// Output with no citations.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }
}

/// Schema advertised to the model for one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model calls the tool by.
    fn name(&self) -> &str;

    /// One-line description for the model.
    fn description(&self) -> &str;

    /// JSON schema for the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Run the tool with validated arguments.
    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError>;
}

/// Fixed name to tool mapping.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Definitions of all tools in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Registered tool names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Parse, validate and run a tool call.
    ///
    /// The handler runs on its own task: if the caller is dropped mid-call
    /// the tool still completes and its result is discarded.
    #[instrument(skip(self, raw_arguments))]
    pub async fn invoke(&self, name: &str, raw_arguments: &str) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = parse_arguments(raw_arguments)?;
        validate_arguments(&tool.parameters_schema(), &args)?;

        debug!("Invoking tool {} with {}", name, args);

        let handle = tokio::spawn(async move { tool.execute(args).await });
        let result = handle
            .await
            .map_err(|e| ToolError::Aborted(e.to_string()))?;

        if let Err(ref e) = result {
            warn!("Tool {} failed: {}", name, e);
        }

        result
    }
}

/// Parse raw arguments into a JSON object. Blank input means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

    if !value.is_object() {
        return Err(ToolError::InvalidArguments(format!(
            "expected a JSON object, got {}",
            value
        )));
    }

    Ok(value)
}

/// Add sources to `acc`, skipping ones already present.
pub fn merge_sources(acc: &mut Vec<Source>, sources: impl IntoIterator<Item = Source>) {
    for source in sources {
        if !acc.contains(&source) {
            acc.push(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the message back"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "times": { "type": "integer", "minimum": 1 }
                },
                "required": ["message"]
            })
        }

        async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
            let message = args["message"].as_str().unwrap_or_default();
            let times = args["times"].as_u64().unwrap_or(1) as usize;
            if message == "fail" {
                return Err(ToolError::Execution("asked to fail".to_string()));
            }
            Ok(ToolOutput::text(message.repeat(times)))
        }
    }

    /// Sleeps, then records that it ran to completion.
    struct SlowTool {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Finish after a short delay"
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }

        async fn execute(&self, _args: Value) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(ToolOutput::text("done"))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new().with_tool(Arc::new(EchoTool))
    }

    #[tokio::test]
    async fn test_invoke_valid_call() {
        let output = registry()
            .invoke("echo", r#"{"message": "hi", "times": 2}"#)
            .await
            .unwrap();
        assert_eq!(output.content, "hihi");
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_errors() {
        let registry = registry();

        assert_eq!(
            registry.invoke("nope", "{}").await,
            Err(ToolError::UnknownTool("nope".to_string()))
        );
        assert!(matches!(
            registry.invoke("echo", "{not json").await,
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            registry.invoke("echo", "[1, 2]").await,
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            registry.invoke("echo", "{}").await,
            Err(ToolError::SchemaViolation(_))
        ));
        assert!(matches!(
            registry.invoke("echo", r#"{"message": "hi", "times": 0}"#).await,
            Err(ToolError::SchemaViolation(_))
        ));
        assert_eq!(
            registry.invoke("echo", r#"{"message": "fail"}"#).await,
            Err(ToolError::Execution("asked to fail".to_string()))
        );
    }

    #[tokio::test]
    async fn test_dropped_invoke_lets_tool_finish() {
        let finished = Arc::new(AtomicBool::new(false));
        let registry = ToolRegistry::new().with_tool(Arc::new(SlowTool {
            finished: finished.clone(),
        }));

        let dropped = tokio::time::timeout(Duration::from_millis(10), registry.invoke("slow", "{}")).await;
        assert!(dropped.is_err());
        assert!(!finished.load(Ordering::SeqCst));

        for _ in 0..50 {
            if finished.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_definitions_keep_registration_order() {
        let mut registry = registry();
        registry.register(Arc::new(EchoTool));

        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "echo");
        assert_eq!(registry.names(), ["echo".to_string()]);
    }

    #[test]
    fn test_merge_sources_dedups_in_order() {
        let a = Source {
            label: "Course A - Lesson 1".to_string(),
            link: None,
        };
        let b = Source {
            label: "Course B - Lesson 2".to_string(),
            link: None,
        };

        let mut acc = vec![a.clone()];
        merge_sources(&mut acc, vec![b.clone(), a.clone(), b.clone()]);
        assert_eq!(acc, vec![a, b]);
    }
}
