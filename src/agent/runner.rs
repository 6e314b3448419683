//! Agent runner with a bounded tool calling loop.

use crate::config::{AgentPrompts, ClosingPolicy};
use crate::error::{Result, SyllabusError};
use crate::generation::{ChatModel, Message, ModelRequest, ModelResponse, ToolCallRequest};
use crate::session::{ConversationTurn, Role};
use crate::tools::{merge_sources, Source, ToolDefinition, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Upper bound on tool-enabled rounds per query.
const MAX_TOOL_ROUNDS: usize = 2;

/// Why the agent stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The model answered without requesting tools.
    NoToolRequest,
    /// The last allowed round still requested tools.
    RoundCeiling,
    /// A tool invocation failed.
    ToolFailure,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Round the call was requested in, starting at 1.
    pub round: usize,
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result text fed back to the model.
    pub result: String,
    /// Whether the invocation failed.
    pub failed: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final answer, never empty.
    pub content: String,
    /// Citations from every tool call, de-duplicated in order.
    pub sources: Vec<Source>,
    /// Tool-enabled rounds used.
    pub rounds: usize,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// How the run ended.
    pub termination: Termination,
}

/// Mutable state of one run.
struct RunState {
    messages: Vec<Message>,
    sources: Vec<Source>,
    records: Vec<ToolCallRecord>,
}

/// Agent that answers with the help of registered tools.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    prompts: AgentPrompts,
    max_rounds: usize,
    closing: ClosingPolicy,
}

impl Agent {
    /// Create a new agent with default prompts and two tool rounds.
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            registry,
            prompts: AgentPrompts::default(),
            max_rounds: MAX_TOOL_ROUNDS,
            closing: ClosingPolicy::Model,
        }
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: AgentPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the number of tool-enabled rounds, clamped to 1..=2.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.clamp(1, MAX_TOOL_ROUNDS);
        self
    }

    /// Set how the agent finishes after the last round.
    pub fn with_closing(mut self, closing: ClosingPolicy) -> Self {
        self.closing = closing;
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Answer a query given prior conversation turns.
    #[instrument(skip(self, history), fields(model = %self.model.model_name()))]
    pub async fn answer(&self, query: &str, history: &[ConversationTurn]) -> Result<AgentResponse> {
        let mut state = RunState {
            messages: history.iter().map(to_message).collect(),
            sources: Vec::new(),
            records: Vec::new(),
        };
        state.messages.push(Message::User(query.to_string()));

        let tools = self.registry.definitions();
        let mut round = 0;

        loop {
            round += 1;
            debug!("Agent round {}", round);

            let response = self
                .model
                .complete(&self.request(&state.messages, Some(tools.clone())))
                .await?;

            if response.tool_calls.is_empty() {
                let content = response.text_content().map(str::to_string);
                return Ok(self.finish(content, state, round, Termination::NoToolRequest));
            }

            state.messages.push(Message::Assistant {
                content: response.content.clone(),
                tool_calls: response.tool_calls.clone(),
            });

            let failed = self.run_tools(round, &response.tool_calls, &mut state).await;

            if failed {
                let content = self.closing_call(&mut state.messages).await?;
                return Ok(self.finish(content, state, round, Termination::ToolFailure));
            }

            if round >= self.max_rounds {
                warn!("{} after {} rounds", SyllabusError::OrchestrationExhausted, round);
                let content = match self.closing {
                    ClosingPolicy::Model => self.closing_call(&mut state.messages).await?,
                    ClosingPolicy::Synthesize => synthesize(&response, &state.records, round),
                };
                return Ok(self.finish(content, state, round, Termination::RoundCeiling));
            }
        }
    }

    fn request(&self, messages: &[Message], tools: Option<Vec<ToolDefinition>>) -> ModelRequest {
        ModelRequest {
            system: self.prompts.system.clone(),
            messages: messages.to_vec(),
            tools,
        }
    }

    /// Execute a round's tool calls in order. Returns true if one failed.
    ///
    /// After a failure the remaining calls are not run; they are answered
    /// with a skip notice so every call id still gets a result.
    async fn run_tools(&self, round: usize, calls: &[ToolCallRequest], state: &mut RunState) -> bool {
        let mut failed = false;

        for call in calls {
            let (result, call_failed) = if failed {
                ("Tool call skipped after an earlier failure".to_string(), true)
            } else {
                info!("Agent calling tool: {} with args: {}", call.name, call.arguments);
                match self.registry.invoke(&call.name, &call.arguments).await {
                    Ok(output) => {
                        merge_sources(&mut state.sources, output.sources);
                        (output.content, false)
                    }
                    Err(e) => {
                        let message = SyllabusError::ToolExecution(e.to_string()).to_string();
                        warn!("{}", message);
                        failed = true;
                        (message, true)
                    }
                }
            };

            state.messages.push(Message::Tool {
                call_id: call.id.clone(),
                content: result.clone(),
            });
            state.records.push(ToolCallRecord {
                round,
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                result,
                failed: call_failed,
            });
        }

        failed
    }

    /// One model call with tools disabled, after a closing instruction.
    async fn closing_call(&self, messages: &mut Vec<Message>) -> Result<Option<String>> {
        messages.push(Message::User(self.prompts.closing.clone()));
        let response = self.model.complete(&self.request(messages, None)).await?;
        Ok(response.text_content().map(str::to_string))
    }

    fn finish(
        &self,
        content: Option<String>,
        state: RunState,
        rounds: usize,
        termination: Termination,
    ) -> AgentResponse {
        let content = content
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.prompts.fallback.clone());

        info!(
            "Agent finished after {} rounds ({:?}, {} tool calls)",
            rounds,
            termination,
            state.records.len()
        );

        AgentResponse {
            content,
            sources: state.sources,
            rounds,
            tool_calls: state.records,
            termination,
        }
    }
}

fn to_message(turn: &ConversationTurn) -> Message {
    match turn.role {
        Role::User => Message::User(turn.content.clone()),
        Role::Assistant => Message::assistant(turn.content.clone()),
    }
}

/// Compose an answer from the last round's model text and tool results.
fn synthesize(response: &ModelResponse, records: &[ToolCallRecord], round: usize) -> Option<String> {
    let parts: Vec<&str> = response
        .text_content()
        .into_iter()
        .chain(
            records
                .iter()
                .filter(|r| r.round == round && !r.failed)
                .map(|r| r.result.trim()),
        )
        .filter(|p| !p.is_empty())
        .collect();

    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tool_call, ScriptedModel};
    use crate::tools::{Tool, ToolError, ToolOutput};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct LookupTool;

    #[async_trait]
    impl Tool for LookupTool {
        fn name(&self) -> &str {
            "lookup"
        }

        fn description(&self) -> &str {
            "Look something up"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "topic": { "type": "string" } },
                "required": ["topic"]
            })
        }

        async fn execute(&self, args: Value) -> std::result::Result<ToolOutput, ToolError> {
            let topic = args["topic"].as_str().unwrap_or_default();
            if topic == "explode" {
                return Err(ToolError::Execution("index unavailable".to_string()));
            }
            Ok(ToolOutput {
                content: format!("Facts about {topic}"),
                sources: vec![Source {
                    label: format!("{topic} - Lesson 1"),
                    link: None,
                }],
            })
        }
    }

    fn agent(model: Arc<ScriptedModel>) -> Agent {
        let registry = Arc::new(ToolRegistry::new().with_tool(Arc::new(LookupTool)));
        Agent::new(model, registry)
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let model = Arc::new(ScriptedModel::new(vec![ModelResponse::text("Paris.")]));
        let response = agent(model.clone()).answer("Capital of France?", &[]).await.unwrap();

        assert_eq!(response.content, "Paris.");
        assert_eq!(response.rounds, 1);
        assert_eq!(response.termination, Termination::NoToolRequest);
        assert!(response.sources.is_empty());
        assert_eq!(model.requests().len(), 1);
        assert!(model.requests()[0].tools_enabled());
    }

    #[tokio::test]
    async fn test_one_tool_round_then_answer() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelResponse {
                content: None,
                tool_calls: vec![tool_call("c1", "lookup", r#"{"topic": "rust"}"#)],
            },
            ModelResponse::text("Rust is a language."),
        ]));
        let response = agent(model.clone()).answer("What is Rust?", &[]).await.unwrap();

        assert_eq!(response.content, "Rust is a language.");
        assert_eq!(response.rounds, 2);
        assert_eq!(response.termination, Termination::NoToolRequest);
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.tool_calls[0].result, "Facts about rust");

        // Second request carries the assistant tool call and its result
        let second = &model.requests()[1];
        assert!(second.tools_enabled());
        assert!(matches!(second.messages[1], Message::Assistant { .. }));
        assert_eq!(
            second.messages[2],
            Message::Tool {
                call_id: "c1".to_string(),
                content: "Facts about rust".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_round_ceiling_with_model_closing() {
        let model = Arc::new(ScriptedModel::always_calling("lookup", r#"{"topic": "loops"}"#));
        let response = agent(model.clone()).answer("Tell me about loops", &[]).await.unwrap();

        assert_eq!(response.termination, Termination::RoundCeiling);
        assert_eq!(response.rounds, 2);
        assert_eq!(response.tool_calls.len(), 2);
        assert!(!response.content.is_empty());

        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].tools_enabled());
        assert!(requests[1].tools_enabled());
        assert!(!requests[2].tools_enabled());
        assert_eq!(
            requests[2].messages.last(),
            Some(&Message::User(AgentPrompts::default().closing))
        );
        assert_eq!(response.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_round_ceiling_with_synthesis() {
        let model = Arc::new(ScriptedModel::always_calling("lookup", r#"{"topic": "loops"}"#));
        let response = agent(model.clone())
            .with_closing(ClosingPolicy::Synthesize)
            .answer("Tell me about loops", &[])
            .await
            .unwrap();

        assert_eq!(response.termination, Termination::RoundCeiling);
        assert_eq!(response.content, "Facts about loops");
        assert_eq!(model.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_single_round_limit() {
        let model = Arc::new(ScriptedModel::always_calling("lookup", r#"{"topic": "loops"}"#));
        let agent = agent(model.clone()).with_max_rounds(5);
        assert_eq!(agent.max_rounds(), 2);

        let agent = agent.with_max_rounds(1);
        let response = agent.answer("Tell me about loops", &[]).await.unwrap();
        assert_eq!(response.rounds, 1);
        assert_eq!(model.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_tool_failure_is_absorbed() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelResponse {
                content: None,
                tool_calls: vec![
                    tool_call("c1", "lookup", r#"{"topic": "explode"}"#),
                    tool_call("c2", "lookup", r#"{"topic": "rust"}"#),
                ],
            },
            ModelResponse::text("Sorry, the course index is unavailable."),
        ]));
        let response = agent(model.clone()).answer("Anything?", &[]).await.unwrap();

        assert_eq!(response.termination, Termination::ToolFailure);
        assert_eq!(response.content, "Sorry, the course index is unavailable.");
        assert_eq!(
            response.tool_calls[0].result,
            "Tool execution failed: index unavailable"
        );
        assert!(response.tool_calls[1].failed);
        assert!(response.sources.is_empty());

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[1].tools_enabled());
    }

    #[tokio::test]
    async fn test_schema_violation_counts_as_failure() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelResponse {
                content: None,
                tool_calls: vec![tool_call("c1", "lookup", r#"{"topic": 3}"#)],
            },
            ModelResponse::default(),
        ]));
        let response = agent(model).answer("Anything?", &[]).await.unwrap();

        assert_eq!(response.termination, Termination::ToolFailure);
        assert_eq!(response.content, AgentPrompts::default().fallback);
    }

    #[tokio::test]
    async fn test_history_precedes_query() {
        let model = Arc::new(ScriptedModel::new(vec![ModelResponse::text("Sure.")]));
        let history = vec![
            ConversationTurn::user("Hi"),
            ConversationTurn::assistant("Hello!"),
        ];
        agent(model.clone()).answer("Next?", &history).await.unwrap();

        let messages = &model.requests()[0].messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::User("Hi".to_string()));
        assert_eq!(messages[1], Message::assistant("Hello!"));
        assert_eq!(messages[2], Message::User("Next?".to_string()));
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            round: 1,
            name: "search_course_content".to_string(),
            arguments: r#"{"query": "test"}"#.to_string(),
            result: "Found results".to_string(),
            failed: false,
        };
        assert_eq!(
            format!("{}", record),
            r#"search_course_content({"query": "test"})"#
        );
    }
}
