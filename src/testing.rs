//! Shared test doubles and fixtures.

use crate::chunking::SentenceChunker;
use crate::document::parse_course_document;
use crate::embedding::{Embedder, HashedEmbedder};
use crate::error::Result;
use crate::generation::{ChatModel, ModelRequest, ModelResponse, ToolCallRequest};
use crate::orchestrator::index_document;
use crate::vector_store::{MemoryVectorStore, VectorStore};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub(crate) const INTRO_TO_X: &str = "Course Title: Intro to X
Course Link: https://example.com/x
Course Instructor: Jane Doe

Lesson 1: Getting Started
Lesson Link: https://example.com/x/1
Welcome to Intro to X. In this lesson we install the toolkit and set up a workspace.
You will write your first small program and run it from the terminal.

Lesson 2: Going Further
Lesson Link: https://example.com/x/2
Lesson two covers pipelines. A pipeline connects several processing stages.
Each stage of the pipelines receives records, transforms them and hands them on.
";

pub(crate) const MCP_COURSE: &str = "Course Title: MCP: Build Rich-Context AI Apps
Course Link: https://example.com/mcp
Course Instructor: Sam Rivera

Lesson 0: Introduction
Lesson Link: https://example.com/mcp/0
This course teaches the Model Context Protocol. Servers expose tools and resources.

Lesson 1: Building Servers
Lesson Link: https://example.com/mcp/1
An MCP server registers tools that a client can call. Clients connect over stdio.
";

/// Dimensions large enough that fixture vocabularies rarely collide.
pub(crate) const FIXTURE_DIMENSIONS: usize = 4096;

/// Memory store and hashed embedder with both fixture courses indexed.
pub(crate) async fn index_fixture() -> (Arc<dyn VectorStore>, Arc<dyn Embedder>) {
    let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
    let embedder: Arc<dyn Embedder> = Arc::new(HashedEmbedder::new(FIXTURE_DIMENSIONS));
    let chunker = SentenceChunker::default();

    for text in [INTRO_TO_X, MCP_COURSE] {
        let doc = parse_course_document(text, "fixture").unwrap();
        index_document(store.as_ref(), embedder.as_ref(), &chunker, &doc)
            .await
            .unwrap();
    }

    (store, embedder)
}

pub(crate) fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// Chat model that replays queued responses and records every request.
///
/// Once the queue is empty it repeats `repeat` for tool-enabled requests and
/// answers "Done." otherwise.
pub(crate) struct ScriptedModel {
    responses: Mutex<VecDeque<ModelResponse>>,
    repeat: Option<ModelResponse>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model that requests the same tool whenever tools are offered.
    pub(crate) fn always_calling(name: &str, arguments: &str) -> Self {
        Self {
            repeat: Some(ModelResponse {
                content: None,
                tool_calls: vec![tool_call("repeat", name, arguments)],
            }),
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let round = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return Ok(response);
        }

        match &self.repeat {
            Some(repeat) if request.tools_enabled() => {
                let mut response = repeat.clone();
                for call in &mut response.tool_calls {
                    call.id = format!("{}-{}", call.id, round);
                }
                Ok(response)
            }
            _ => Ok(ModelResponse::text("Done.")),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
