//! Prompt templates for Syllabus.
//!
//! Prompts can be customized by placing an `agent.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
}

/// Prompts used by the tool-calling agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    /// System prompt sent with every model call.
    pub system: String,
    /// Instruction appended before a tools-disabled closing call.
    pub closing: String,
    /// Answer used when the model returns no text.
    pub fallback: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant specialized in course materials and educational content, with access to search and outline tools for course information.

Tool usage:
- Use 'search_course_content' for questions about specific course content, lessons, or detailed material
- Use 'get_course_outline' for questions about course structure, lesson lists, course links, or when asked for an outline or overview of a course
- You may use tools in up to 2 rounds. Use the second round only to follow up on what the first round returned
- If a tool reports that no course matched, say so plainly and do not guess
- If a tool yields no results, state this clearly without offering alternatives

Response protocol:
- General knowledge questions: answer from existing knowledge without tools
- Course-specific questions: use the tools first, then answer
- Course outline questions: give the course title, course link and the complete lesson list
- No meta-commentary: do not describe your reasoning or mention the tools or search results

All responses must be brief, educational, clear, and supported by examples where they help."#
                .to_string(),

            closing: "Based on all the information gathered, provide your final answer now without calling any more tools."
                .to_string(),

            fallback: "I'm sorry, I wasn't able to produce an answer to that question."
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults from the custom directory when present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }
}
