use std::collections::HashMap;
use std::sync::Arc;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::error::{AgentError, ToolError};
use crate::llm::{
    ChatModel, ModelCompletion, ModelMessage, ModelToolCall, ModelToolChoice, ModelToolDefinition,
};
use crate::tools::{ToolSpec, prime_checking_tool};

pub const PRIME_AGENT_NAME: &str = "check_prime_agent";
pub const PRIME_AGENT_DESCRIPTION: &str =
    "check prime agent that can check whether numbers are prime.";
pub const PRIME_AGENT_INSTRUCTION: &str = "You check whether numbers are prime.
When checking prime numbers, call the prime_checking tool with a list of integers. Be sure to pass in a list of integers. You should never pass in a string.
You should not rely on the previous history on prime results.";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_iterations: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_iterations: 24 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Thinking {
        content: String,
    },
    Text {
        content: String,
    },
    ToolCall {
        tool: String,
        args_json: serde_json::Value,
        tool_call_id: String,
    },
    ToolResult {
        tool: String,
        result_text: String,
        tool_call_id: String,
        is_error: bool,
    },
    FinalResponse {
        content: String,
    },
}

#[derive(Default)]
pub struct AgentBuilder {
    name: Option<String>,
    description: String,
    instruction: Option<String>,
    model: Option<Arc<dyn ChatModel>>,
    tools: Vec<ToolSpec>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn model<M>(mut self, model: M) -> Self
    where
        M: ChatModel + 'static,
    {
        self.model = Some(Arc::new(model));
        self
    }

    pub fn shared_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Agent, AgentError> {
        let Some(model) = self.model else {
            return Err(AgentError::Config(
                "agent model must be configured via AgentBuilder::model(...)".to_string(),
            ));
        };

        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(AgentError::Config(
                    "agent name must be configured via AgentBuilder::name(...)".to_string(),
                ));
            }
        };

        let mut tool_map = HashMap::new();
        for tool in &self.tools {
            if tool_map
                .insert(tool.name().to_string(), tool.clone())
                .is_some()
            {
                return Err(AgentError::Config(format!(
                    "duplicate tool registered: {}",
                    tool.name()
                )));
            }
        }

        Ok(Agent {
            name,
            description: self.description,
            instruction: self.instruction,
            model,
            tools: self.tools,
            tool_map,
            config: self.config,
        })
    }
}

/// A model, an instruction and a set of tools. Conversation state is owned by
/// the caller, so one `Agent` can serve many sessions at once.
pub struct Agent {
    name: String,
    description: String,
    instruction: Option<String>,
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolSpec>,
    tool_map: HashMap<String, ToolSpec>,
    config: AgentConfig,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tool_map.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn tool_definitions(&self) -> Vec<ModelToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ModelToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.json_schema().clone(),
            })
            .collect()
    }

    pub async fn query(
        &self,
        history: &mut Vec<ModelMessage>,
        user_message: impl Into<String>,
    ) -> Result<String, AgentError> {
        let stream = self.query_stream(history, user_message.into());
        futures_util::pin_mut!(stream);

        let mut final_response: Option<String> = None;

        while let Some(event) = stream.next().await {
            if let AgentEvent::FinalResponse { content } = event? {
                final_response = Some(content);
            }
        }

        final_response.ok_or(AgentError::MissingFinalResponse)
    }

    /// Runs the tool-calling loop for one user turn, appending every model
    /// and tool message to `history`.
    pub fn query_stream<'a>(
        &'a self,
        history: &'a mut Vec<ModelMessage>,
        user_message: String,
    ) -> impl Stream<Item = Result<AgentEvent, AgentError>> + 'a {
        try_stream! {
            if history.is_empty() {
                if let Some(instruction) = &self.instruction {
                    history.push(ModelMessage::System(instruction.clone()));
                }
            }

            history.push(ModelMessage::User(user_message));

            let tool_definitions = self.tool_definitions();
            let tool_choice = if tool_definitions.is_empty() {
                ModelToolChoice::None
            } else {
                ModelToolChoice::Auto
            };

            for iteration in 0..self.config.max_iterations {
                debug!(agent = %self.name, iteration, "invoking model");
                let completion = self
                    .model
                    .invoke(history.as_slice(), &tool_definitions, tool_choice.clone())
                    .await?;

                if let Some(thinking) = completion.thinking.clone() {
                    yield AgentEvent::Thinking { content: thinking };
                }

                history.push(assistant_message(&completion));

                if let Some(text) = completion.text.clone() {
                    if !text.is_empty() {
                        yield AgentEvent::Text { content: text };
                    }
                }

                if completion.tool_calls.is_empty() {
                    yield AgentEvent::FinalResponse {
                        content: completion.text.unwrap_or_default(),
                    };
                    return;
                }

                for tool_call in completion.tool_calls {
                    yield AgentEvent::ToolCall {
                        tool: tool_call.name.clone(),
                        args_json: tool_call.arguments.clone(),
                        tool_call_id: tool_call.id.clone(),
                    };

                    let execution = self.execute_tool_call(&tool_call).await;
                    history.push(ModelMessage::ToolResult {
                        tool_call_id: tool_call.id.clone(),
                        tool_name: tool_call.name.clone(),
                        content: execution.result_text.clone(),
                        is_error: execution.is_error,
                    });

                    yield AgentEvent::ToolResult {
                        tool: tool_call.name,
                        result_text: execution.result_text,
                        tool_call_id: tool_call.id,
                        is_error: execution.is_error,
                    };
                }
            }

            Err::<(), AgentError>(AgentError::MaxIterationsReached {
                max_iterations: self.config.max_iterations,
            })?;
        }
    }

    async fn execute_tool_call(&self, tool_call: &ModelToolCall) -> ToolExecutionResult {
        let Some(tool) = self.tool_map.get(&tool_call.name) else {
            warn!(agent = %self.name, tool = %tool_call.name, "model requested unknown tool");
            return ToolExecutionResult::error(ToolError::NotFound(tool_call.name.clone()));
        };

        match tool.execute(tool_call.arguments.clone()).await {
            Ok(text) => {
                debug!(tool = %tool_call.name, result = %text, "tool call succeeded");
                ToolExecutionResult {
                    result_text: text,
                    is_error: false,
                }
            }
            Err(err) => {
                warn!(tool = %tool_call.name, error = %err, "tool call failed");
                ToolExecutionResult::error(err)
            }
        }
    }
}

fn assistant_message(completion: &ModelCompletion) -> ModelMessage {
    ModelMessage::Assistant {
        content: completion.text.clone(),
        tool_calls: completion.tool_calls.clone(),
    }
}

struct ToolExecutionResult {
    result_text: String,
    is_error: bool,
}

impl ToolExecutionResult {
    fn error(err: ToolError) -> Self {
        Self {
            result_text: err.to_string(),
            is_error: true,
        }
    }
}

/// The prime-checking agent: one model, the fixed instruction and the
/// `prime_checking` tool.
pub fn prime_agent(model: Arc<dyn ChatModel>, config: AgentConfig) -> Result<Agent, AgentError> {
    Agent::builder()
        .name(PRIME_AGENT_NAME)
        .description(PRIME_AGENT_DESCRIPTION)
        .instruction(PRIME_AGENT_INSTRUCTION)
        .shared_model(model)
        .tool(prime_checking_tool()?)
        .config(config)
        .build()
}

#[cfg(test)]
mod tests;
