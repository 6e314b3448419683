//! Tool-calling agent that answers questions about course materials.
//!
//! The agent runs a bounded sequence of tool-enabled model rounds, executing
//! requested tools between rounds, and always ends with a textual answer and
//! the citations gathered along the way.

mod runner;

pub use runner::{Agent, AgentResponse, Termination, ToolCallRecord};
