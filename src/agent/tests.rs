use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;

use super::*;
use crate::error::ProviderError;

#[derive(Default)]
struct MockModel {
    responses: Mutex<VecDeque<Result<ModelCompletion, ProviderError>>>,
}

impl MockModel {
    fn with_responses(responses: Vec<Result<ModelCompletion, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
        }
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn invoke(
        &self,
        _messages: &[ModelMessage],
        _tools: &[ModelToolDefinition],
        _tool_choice: ModelToolChoice,
    ) -> Result<ModelCompletion, ProviderError> {
        let mut guard = self.responses.lock().expect("lock poisoned");
        guard.pop_front().unwrap_or_else(|| {
            Err(ProviderError::Response(
                "no more mock model responses".to_string(),
            ))
        })
    }
}

fn text(content: &str) -> ModelCompletion {
    ModelCompletion {
        text: Some(content.to_string()),
        ..ModelCompletion::default()
    }
}

fn calls(tool_calls: Vec<ModelToolCall>) -> ModelCompletion {
    ModelCompletion {
        tool_calls,
        ..ModelCompletion::default()
    }
}

fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ModelToolCall {
    ModelToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

fn agent_with(model: MockModel) -> Agent {
    prime_agent(Arc::new(model), AgentConfig::default()).expect("agent builds")
}

async fn collect_events(
    agent: &Agent,
    history: &mut Vec<ModelMessage>,
    message: &str,
) -> Vec<AgentEvent> {
    agent
        .query_stream(history, message.to_string())
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("events ok")
}

#[tokio::test]
async fn query_returns_no_tool_response() {
    let agent = agent_with(MockModel::with_responses(vec![Ok(text("hello"))]));
    let mut history = Vec::new();

    let response = agent.query(&mut history, "hi").await.expect("query succeeds");

    assert_eq!(response, "hello");
    assert_eq!(history[0], ModelMessage::System(PRIME_AGENT_INSTRUCTION.to_string()));
    assert_eq!(history[1], ModelMessage::User("hi".to_string()));
}

#[tokio::test]
async fn prime_tool_call_then_final_response_flow() {
    let model = MockModel::with_responses(vec![
        Ok(calls(vec![tool_call(
            "call_1",
            "prime_checking",
            json!({"nums": [2, 4, 5, 9]}),
        )])),
        Ok(text("2 and 5 are prime.")),
    ]);
    let agent = agent_with(model);
    let mut history = Vec::new();

    let events = collect_events(&agent, &mut history, "Which of 2, 4, 5, 9 are prime?").await;

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], AgentEvent::ToolCall { .. }));
    assert_eq!(
        events[1],
        AgentEvent::ToolResult {
            tool: "prime_checking".to_string(),
            result_text: "2, 5 are prime numbers.".to_string(),
            tool_call_id: "call_1".to_string(),
            is_error: false,
        }
    );
    assert_eq!(
        events[2],
        AgentEvent::Text {
            content: "2 and 5 are prime.".to_string()
        }
    );
    assert_eq!(
        events[3],
        AgentEvent::FinalResponse {
            content: "2 and 5 are prime.".to_string()
        }
    );

    assert!(history.iter().any(|message| matches!(
        message,
        ModelMessage::ToolResult { content, is_error: false, .. }
            if content == "2, 5 are prime numbers."
    )));
}

#[tokio::test]
async fn history_is_carried_into_the_next_turn() {
    let agent = agent_with(MockModel::with_responses(vec![
        Ok(text("first")),
        Ok(text("second")),
    ]));
    let mut history = Vec::new();

    agent.query(&mut history, "one").await.expect("first turn");
    agent.query(&mut history, "two").await.expect("second turn");

    let system_messages = history
        .iter()
        .filter(|message| matches!(message, ModelMessage::System(_)))
        .count();
    assert_eq!(system_messages, 1);
    assert_eq!(history.len(), 5);
    assert_eq!(history[3], ModelMessage::User("two".to_string()));
}

#[tokio::test]
async fn string_arguments_are_reported_back_as_tool_errors() {
    let model = MockModel::with_responses(vec![
        Ok(calls(vec![tool_call(
            "call_2",
            "prime_checking",
            json!({"nums": "2, 3"}),
        )])),
        Ok(text("Please give me integers.")),
    ]);
    let agent = agent_with(model);
    let mut history = Vec::new();

    let events = collect_events(&agent, &mut history, "are 2 and 3 prime").await;

    assert!(events.iter().any(|event| matches!(
        event,
        AgentEvent::ToolResult { is_error: true, result_text, .. }
            if result_text.contains("must be of type array")
    )));
    assert_eq!(
        events.last(),
        Some(&AgentEvent::FinalResponse {
            content: "Please give me integers.".to_string()
        })
    );
}

#[tokio::test]
async fn unknown_tool_is_reported_back_to_model() {
    let model = MockModel::with_responses(vec![
        Ok(calls(vec![tool_call("call_3", "factorize", json!({}))])),
        Ok(text("fallback")),
    ]);
    let agent = agent_with(model);
    let mut history = Vec::new();

    let events = collect_events(&agent, &mut history, "factor 12").await;

    assert!(events.iter().any(|event| matches!(
        event,
        AgentEvent::ToolResult { is_error: true, result_text, .. }
            if result_text == "tool not found: factorize"
    )));
}

#[tokio::test]
async fn max_iterations_error_when_tool_loop_never_finishes() {
    let model = MockModel::with_responses(vec![Ok(calls(vec![tool_call(
        "call_4",
        "prime_checking",
        json!({"nums": [7]}),
    )]))]);
    let agent = prime_agent(Arc::new(model), AgentConfig { max_iterations: 1 })
        .expect("agent builds");
    let mut history = Vec::new();

    let err = agent
        .query(&mut history, "loop")
        .await
        .expect_err("must fail");
    assert!(matches!(
        err,
        AgentError::MaxIterationsReached { max_iterations: 1 }
    ));
}

#[tokio::test]
async fn provider_errors_end_the_stream() {
    let model = MockModel::with_responses(vec![Err(ProviderError::Request(
        "quota exceeded".to_string(),
    ))]);
    let agent = agent_with(model);
    let mut history = Vec::new();

    let err = agent
        .query(&mut history, "is 3 prime")
        .await
        .expect_err("must fail");
    assert!(matches!(err, AgentError::Provider(_)));
}

#[tokio::test]
async fn thinking_is_emitted_before_tool_calls() {
    let model = MockModel::with_responses(vec![
        Ok(ModelCompletion {
            thinking: Some("use the tool".to_string()),
            ..calls(vec![tool_call("call_5", "prime_checking", json!({"nums": [4]}))])
        }),
        Ok(text("4 is not prime.")),
    ]);
    let agent = agent_with(model);
    let mut history = Vec::new();

    let events = collect_events(&agent, &mut history, "is 4 prime").await;

    assert_eq!(
        events[0],
        AgentEvent::Thinking {
            content: "use the tool".to_string()
        }
    );
    assert!(events.iter().any(|event| matches!(
        event,
        AgentEvent::ToolResult { result_text, .. } if result_text == "No prime numbers found."
    )));
}

#[test]
fn builder_requires_model_and_name() {
    let err = Agent::builder()
        .name("nameless_model")
        .build()
        .expect_err("model required");
    assert!(matches!(err, AgentError::Config(_)));

    let err = Agent::builder()
        .model(MockModel::default())
        .build()
        .expect_err("name required");
    assert!(matches!(err, AgentError::Config(_)));
}

#[test]
fn builder_rejects_duplicate_tools() {
    let tool = prime_checking_tool().expect("tool builds");
    let err = Agent::builder()
        .name("dup")
        .model(MockModel::default())
        .tools(vec![tool.clone(), tool])
        .build()
        .expect_err("duplicate rejected");
    assert!(err.to_string().contains("duplicate tool registered: prime_checking"));
}

#[test]
fn prime_agent_exposes_single_tool_definition() {
    let agent = agent_with(MockModel::default());

    assert_eq!(agent.name(), PRIME_AGENT_NAME);
    let definitions = agent.tool_definitions();
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].name, "prime_checking");
    assert_eq!(definitions[0].parameters["properties"]["nums"]["type"], "array");
}
