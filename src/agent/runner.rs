//! Agent runner with tool calling loop.

use super::tools::{parse_tool_call, tool_definitions, ToolContext};
use crate::config::AgentSettings;
use crate::error::{PodgistError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Answer shown when the deadline expires before the loop finishes.
const DEADLINE_ANSWER: &str =
    "I don't have that information yet; the lookup ran out of time. Try a more specific question.";

/// Agent that answers questions over the episode archive via tools.
pub struct Agent {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    settings: AgentSettings,
    tools: ToolContext,
    system_prompt: String,
}

impl Agent {
    pub fn new(tools: ToolContext, settings: AgentSettings, system_prompt: &str) -> Self {
        Self {
            client: create_client(),
            settings,
            tools,
            system_prompt: system_prompt.to_string(),
        }
    }

    /// Answer a question, bounded by the configured wall-clock deadline.
    ///
    /// Hitting the deadline is not an error: the caller gets a graceful
    /// no-answer response instead of a raw timeout.
    pub async fn ask(&self, question: &str) -> Result<AgentResponse> {
        let deadline = Duration::from_secs(self.settings.deadline_seconds);

        match tokio::time::timeout(deadline, self.run_loop(question)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Agent hit the {}s deadline before finishing",
                    self.settings.deadline_seconds
                );
                Ok(AgentResponse {
                    content: DEADLINE_ANSWER.to_string(),
                    tool_calls: Vec::new(),
                    iterations: 0,
                })
            }
        }
    }

    async fn run_loop(&self, question: &str) -> Result<AgentResponse> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.clone())
                .build()
                .map_err(|e| PodgistError::Agent(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(question.to_string())
                .build()
                .map_err(|e| PodgistError::Agent(e.to_string()))?
                .into(),
        ];

        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.settings.max_iterations {
                return Err(PodgistError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.settings.max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            let request = CreateChatCompletionRequestArgs::default()
                .model(&self.settings.model)
                .messages(messages.clone())
                .tools(tool_definitions())
                .build()
                .map_err(|e| PodgistError::Agent(e.to_string()))?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(|e| PodgistError::OpenAI(format!("Agent API error: {}", e)))?;

            let choice = response
                .choices
                .first()
                .ok_or_else(|| PodgistError::Agent("No response from model".to_string()))?;

            match &choice.message.tool_calls {
                Some(tool_calls) if !tool_calls.is_empty() => {
                    let assistant_msg = ChatCompletionRequestAssistantMessageArgs::default()
                        .tool_calls(tool_calls.clone())
                        .build()
                        .map_err(|e| PodgistError::Agent(e.to_string()))?;
                    messages.push(assistant_msg.into());

                    for tool_call in tool_calls {
                        let record = self.execute_tool_call(tool_call).await;

                        let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(&tool_call.id)
                            .content(record.result.clone())
                            .build()
                            .map_err(|e| PodgistError::Agent(e.to_string()))?;
                        messages.push(tool_msg.into());

                        tool_calls_made.push(record);
                    }
                }
                _ => {
                    return Ok(AgentResponse {
                        content: choice.message.content.clone().unwrap_or_default(),
                        tool_calls: tool_calls_made,
                        iterations,
                    });
                }
            }
        }
    }

    /// Execute a single tool call, never propagating the failure: the model
    /// sees the error text and can recover or rephrase.
    async fn execute_tool_call(&self, tool_call: &ChatCompletionMessageToolCall) -> ToolCallRecord {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Agent calling tool: {} with args: {}", name, arguments);

        let result = match parse_tool_call(name, arguments) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        };

        ToolCallRecord {
            name: name.clone(),
            arguments: arguments.clone(),
            result,
        }
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// Final answer text.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: String,
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "search_chunks".to_string(),
            arguments: r#"{"query": "test"}"#.to_string(),
            result: "Found passages".to_string(),
        };
        assert_eq!(
            format!("{}", record),
            r#"search_chunks({"query": "test"})"#
        );
    }
}
