//! Conversational question-answering agent.
//!
//! Exposes the retrieval layer to a chat model through a declarative tool
//! set and runs the tool-calling loop under a wall-clock deadline.

mod runner;
mod tools;

pub use runner::{Agent, AgentResponse, ToolCallRecord};
pub use tools::{parse_tool_call, tool_definitions, ToolCall, ToolContext};
