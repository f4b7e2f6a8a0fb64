//! HTTP surface: the agent card and the A2A JSON-RPC endpoint.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::a2a::{
    AGENT_CARD_PATH, AgentCard, Artifact, InMemoryStore, JSONRPC_VERSION, JsonRpcRequest,
    JsonRpcResponse, LEGACY_AGENT_CARD_PATH, Message, MessageSendParams, Part, RpcError, Task,
    TaskIdParams, TaskQueryParams, TaskState, TaskStatus, build_agent_card,
};
use crate::agent::{Agent, AgentEvent};
use crate::config::Config;
use crate::error::{AgentError, ServerError};
use crate::llm::ModelMessage;

#[derive(Clone)]
pub struct ServerState {
    agent: Arc<Agent>,
    card: Arc<AgentCard>,
    store: Arc<InMemoryStore>,
}

impl ServerState {
    pub fn new(agent: Agent, public_url: &str) -> Self {
        let card = build_agent_card(&agent, public_url);
        Self {
            agent: Arc::new(agent),
            card: Arc::new(card),
            store: Arc::new(InMemoryStore::new()),
        }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/", post(handle_rpc))
        .route(AGENT_CARD_PATH, get(agent_card))
        .route(LEGACY_AGENT_CARD_PATH, get(agent_card))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: &Config, agent: Agent) -> Result<(), ServerError> {
    let state = ServerState::new(agent, &config.public_url);
    let app = make_app(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(
        "A2A prime checker listening on {} (card at {}{})",
        listener.local_addr()?,
        config.public_url.trim_end_matches('/'),
        AGENT_CARD_PATH
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn agent_card(State(state): State<ServerState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// JSON-RPC errors travel in a 200 response body.
async fn handle_rpc(State(state): State<ServerState>, body: Bytes) -> Json<JsonRpcResponse> {
    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => payload,
        Err(err) => return Json(JsonRpcResponse::failure(Value::Null, RpcError::parse_error(err))),
    };

    let id = payload.get("id").cloned().unwrap_or(Value::Null);
    let request = match serde_json::from_value::<JsonRpcRequest>(payload) {
        Ok(request) if request.jsonrpc == JSONRPC_VERSION => request,
        Ok(request) => {
            return Json(JsonRpcResponse::failure(
                id,
                RpcError::invalid_request(format!("unsupported jsonrpc version {:?}", request.jsonrpc)),
            ));
        }
        Err(err) => return Json(JsonRpcResponse::failure(id, RpcError::invalid_request(err))),
    };

    debug!(method = %request.method, "json-rpc request");
    let outcome = dispatch(&state, &request.method, request.params).await;

    Json(match outcome {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => {
            debug!(method = %request.method, code = error.code, "json-rpc error: {}", error.message);
            JsonRpcResponse::failure(id, error)
        }
    })
}

async fn dispatch(state: &ServerState, method: &str, params: Value) -> Result<Value, RpcError> {
    let task = match method {
        "message/send" => send_message(state, parse_params(params)?).await?,
        "tasks/get" => get_task(state, parse_params(params)?).await?,
        "tasks/cancel" => cancel_task(state, parse_params(params)?).await?,
        "message/stream"
        | "tasks/resubscribe"
        | "tasks/pushNotificationConfig/set"
        | "tasks/pushNotificationConfig/get"
        | "tasks/pushNotificationConfig/list"
        | "tasks/pushNotificationConfig/delete" => return Err(RpcError::unsupported(method)),
        other => return Err(RpcError::method_not_found(other)),
    };

    serde_json::to_value(task).map_err(RpcError::internal)
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(RpcError::invalid_params)
}

async fn send_message(state: &ServerState, params: MessageSendParams) -> Result<Task, RpcError> {
    let MessageSendParams {
        message,
        configuration,
    } = params;

    let user_text = message.text_content();
    if user_text.trim().is_empty() {
        return Err(RpcError::invalid_params("message has no text or data parts"));
    }

    if let Some(task_id) = message.task_id.as_deref() {
        let existing = state
            .store
            .get_task(task_id)
            .await
            .ok_or_else(|| RpcError::task_not_found(task_id))?;
        let task_state = existing.status.state;
        return Err(RpcError::invalid_params(if task_state.is_terminal() {
            format!("task {task_id} is already in terminal state {task_state:?}")
        } else {
            format!("task {task_id} is still {task_state:?}")
        }));
    }

    let context_id = message
        .context_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let task_id = Uuid::new_v4().to_string();
    let user_message = Message {
        context_id: Some(context_id.clone()),
        task_id: Some(task_id.clone()),
        ..message
    };

    info!(task_id = %task_id, context_id = %context_id, "running agent");
    let outcome = {
        let session = state.store.session(&context_id).await;
        let mut history = session.lock().await;
        run_agent(&state.agent, &mut history, user_text).await
    };

    let task = match outcome {
        Ok(reply) => {
            let agent_message = Message::agent_text(reply.clone())
                .with_context(Some(context_id.clone()), Some(task_id.clone()));
            let mut task = Task::new(
                &task_id,
                &context_id,
                TaskStatus::now(TaskState::Completed, Some(agent_message.clone())),
            );
            task.history = vec![user_message, agent_message];
            task.artifacts.push(Artifact {
                artifact_id: Uuid::new_v4().to_string(),
                name: Some("response".to_string()),
                parts: vec![Part::Text { text: reply }],
            });
            task
        }
        Err(err) => {
            warn!(task_id = %task_id, "agent run failed: {err}");
            let agent_message = Message::agent_text(err.to_string())
                .with_context(Some(context_id.clone()), Some(task_id.clone()));
            let mut task = Task::new(
                &task_id,
                &context_id,
                TaskStatus::now(TaskState::Failed, Some(agent_message.clone())),
            );
            task.history = vec![user_message, agent_message];
            task
        }
    };

    state.store.save_task(task.clone()).await;

    let history_length = configuration.and_then(|configuration| configuration.history_length);
    Ok(task.with_history_limit(history_length))
}

async fn run_agent(
    agent: &Agent,
    history: &mut Vec<ModelMessage>,
    user_text: String,
) -> Result<String, AgentError> {
    let stream = agent.query_stream(history, user_text);
    futures_util::pin_mut!(stream);

    let mut final_response = None;
    while let Some(event) = stream.next().await {
        match event? {
            AgentEvent::ToolCall {
                tool, args_json, ..
            } => info!(tool = %tool, args = %args_json, "tool call"),
            AgentEvent::ToolResult {
                tool,
                result_text,
                is_error,
                ..
            } => info!(tool = %tool, is_error, "tool result: {result_text}"),
            AgentEvent::Thinking { content } => debug!("model thinking: {content}"),
            AgentEvent::Text { .. } => {}
            AgentEvent::FinalResponse { content } => final_response = Some(content),
        }
    }

    final_response.ok_or(AgentError::MissingFinalResponse)
}

async fn get_task(state: &ServerState, params: TaskQueryParams) -> Result<Task, RpcError> {
    state
        .store
        .get_task(&params.id)
        .await
        .map(|task| task.with_history_limit(params.history_length))
        .ok_or_else(|| RpcError::task_not_found(&params.id))
}

async fn cancel_task(state: &ServerState, params: TaskIdParams) -> Result<Task, RpcError> {
    let mut task = state
        .store
        .get_task(&params.id)
        .await
        .ok_or_else(|| RpcError::task_not_found(&params.id))?;

    if task.status.state.is_terminal() {
        return Err(RpcError::task_not_cancelable(&task.id, task.status.state));
    }

    info!(task_id = %task.id, "canceling task");
    task.status = TaskStatus::now(TaskState::Canceled, None);
    state.store.save_task(task.clone()).await;
    Ok(task)
}
