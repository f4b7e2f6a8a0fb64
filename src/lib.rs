//! Prime-checking agent served over the A2A protocol.
//!
//! - `Agent` tool-calling loop with `query` and `query_stream` entry points
//! - `prime_checking` tool with JSON schema validation
//! - Gemini adapter via `GoogleModel`
//! - A2A JSON-RPC server, agent card and a small client

pub mod a2a;
pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod tools;

pub use a2a::{A2aClient, AgentCard, InMemoryStore, Task, TaskState, build_agent_card};
pub use agent::{Agent, AgentBuilder, AgentConfig, AgentEvent, prime_agent};
pub use config::Config;
pub use error::{
    AgentError, ClientError, ConfigError, ProviderError, SchemaError, ServerError, ToolError,
};
pub use llm::{
    ChatModel, GoogleModel, GoogleModelConfig, ModelCompletion, ModelMessage, ModelToolCall,
    ModelToolChoice, ModelToolDefinition,
};
pub use server::{ServerState, make_app, run_server};
pub use tools::ToolSpec;
