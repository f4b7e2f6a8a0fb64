use reqwest::Client;
use serde_json::json;

use crate::a2a::{AGENT_CARD_PATH, AgentCard, JsonRpcRequest, JsonRpcResponse, Message, Task};
use crate::error::ClientError;

/// Minimal JSON-RPC client for an A2A agent.
#[derive(Debug, Clone)]
pub struct A2aClient {
    client: Client,
    base_url: String,
}

impl A2aClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .build()
            .map_err(|err| ClientError::Request(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_agent_card(&self) -> Result<AgentCard, ClientError> {
        let response = self
            .client
            .get(format!("{}{AGENT_CARD_PATH}", self.base_url))
            .send()
            .await
            .map_err(|err| ClientError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Request(format!(
                "agent card request failed ({})",
                response.status()
            )));
        }

        response
            .json::<AgentCard>()
            .await
            .map_err(|err| ClientError::Response(err.to_string()))
    }

    /// Sends one user message over `message/send` and returns the resulting task.
    pub async fn send_message(
        &self,
        text: impl Into<String>,
        context_id: Option<String>,
    ) -> Result<Task, ClientError> {
        let message = Message::user_text(text).with_context(context_id, None);
        let request = JsonRpcRequest::new("message/send", json!({ "message": message }));

        let response = self
            .client
            .post(format!("{}/", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|err| ClientError::Request(err.to_string()))?
            .json::<JsonRpcResponse>()
            .await
            .map_err(|err| ClientError::Response(err.to_string()))?;

        decode_task(response)
    }
}

fn decode_task(response: JsonRpcResponse) -> Result<Task, ClientError> {
    if let Some(error) = response.error {
        return Err(ClientError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let result = response
        .result
        .ok_or_else(|| ClientError::Response("response has neither result nor error".to_string()))?;

    serde_json::from_value(result).map_err(|err| ClientError::Response(err.to_string()))
}

/// Human-readable summary of an agent card.
pub fn format_agent_card(card: &AgentCard) -> String {
    let rule = "*".repeat(60);
    let mut lines = vec![
        rule.clone(),
        format!("** Agent: {}", card.name),
        format!("** Version: {}", card.version),
        format!("** Description: {}", card.description),
        format!("** A2A Protocol Version: {}", card.protocol_version),
        format!("** URL: {}", card.url),
        format!("** Transport: {}", card.preferred_transport),
        "** Skills:".to_string(),
    ];

    if card.skills.is_empty() {
        lines.push("    No skills defined.".to_string());
    }
    for skill in &card.skills {
        lines.push(format!("    - Name: {}", skill.name));
        lines.push(format!("      ID: {}", skill.id));
        lines.push(format!("      Description: {}", skill.description));
        lines.push(format!("      Tags: {}", skill.tags.join(", ")));
    }

    lines.push(rule);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::a2a::{AgentCapabilities, AgentSkill, RpcError, TaskState};

    fn card() -> AgentCard {
        AgentCard {
            name: "check_prime_agent".to_string(),
            description: "checks primes".to_string(),
            url: "http://localhost:8086/".to_string(),
            version: "0.1.0".to_string(),
            protocol_version: "0.3.0".to_string(),
            preferred_transport: "JSONRPC".to_string(),
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
            skills: vec![AgentSkill {
                id: "check_prime_agent-prime_checking".to_string(),
                name: "prime_checking".to_string(),
                description: "Check if numbers in a list are prime".to_string(),
                tags: vec!["llm".to_string(), "tools".to_string()],
                examples: Vec::new(),
            }],
        }
    }

    #[test]
    fn format_lists_skills() {
        let text = format_agent_card(&card());

        assert!(text.contains("** Agent: check_prime_agent"));
        assert!(text.contains("    - Name: prime_checking"));
        assert!(text.contains("      Tags: llm, tools"));
        assert!(!text.contains("No skills defined."));
    }

    #[test]
    fn format_notes_missing_skills() {
        let mut card = card();
        card.skills.clear();
        assert!(format_agent_card(&card).contains("No skills defined."));
    }

    #[test]
    fn decode_task_surfaces_rpc_errors() {
        let response = JsonRpcResponse::failure(json!("1"), RpcError::task_not_found("t-9"));
        let err = decode_task(response).expect_err("should fail");
        assert!(matches!(err, ClientError::Rpc { code: -32001, .. }));
    }

    #[test]
    fn decode_task_parses_result() {
        let response = JsonRpcResponse::success(
            json!("1"),
            json!({
                "kind": "task",
                "id": "t-1",
                "contextId": "ctx",
                "status": {"state": "completed"},
                "history": [],
                "artifacts": []
            }),
        );

        let task = decode_task(response).expect("task parses");
        assert_eq!(task.status.state, TaskState::Completed);
    }

    #[test]
    fn base_url_is_normalized() {
        let client = A2aClient::new("http://localhost:8086/").expect("client builds");
        assert_eq!(client.base_url(), "http://localhost:8086");
    }
}
