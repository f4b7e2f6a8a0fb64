use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::llm::{
    ChatModel, ModelCompletion, ModelMessage, ModelToolCall, ModelToolChoice, ModelToolDefinition,
    ModelUsage,
};

const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct GoogleModelConfig {
    pub api_key: String,
    pub model: String,
    pub api_base_url: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub thinking_budget_tokens: Option<u32>,
    pub include_thoughts: Option<bool>,
}

impl GoogleModelConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_base_url: None,
            temperature: None,
            top_p: None,
            max_output_tokens: Some(4096),
            thinking_budget_tokens: None,
            include_thoughts: None,
        }
    }

    pub fn with_api_base_url(mut self, api_base_url: Option<String>) -> Self {
        self.api_base_url = api_base_url;
        self
    }
}

/// Gemini over the `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GoogleModel {
    client: Client,
    config: GoogleModelConfig,
}

impl GoogleModel {
    pub fn new(config: GoogleModelConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::Request("google api key is empty".to_string()));
        }

        let client = Client::builder()
            .build()
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/models/{}:generateContent", self.config.model)
    }
}

#[async_trait]
impl ChatModel for GoogleModel {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        tools: &[ModelToolDefinition],
        tool_choice: ModelToolChoice,
    ) -> Result<ModelCompletion, ProviderError> {
        let request = build_request(messages, tools, tool_choice, &self.config);
        debug!(
            model = %self.config.model,
            contents = request.contents.len(),
            tools = tools.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let message = extract_api_error(response).await;
            warn!(model = %self.config.model, "{message}");
            return Err(ProviderError::Request(message));
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| ProviderError::Response(err.to_string()))?;

        let completion = normalize_response(payload)?;
        if let Some(usage) = &completion.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                tool_calls = completion.tool_calls.len(),
                "generateContent completed"
            );
        }
        Ok(completion)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GoogleContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GoogleSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GoogleTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<GoogleToolConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GoogleGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct GoogleContent {
    role: String,
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSystemInstruction {
    parts: Vec<GooglePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTool {
    function_declarations: Vec<GoogleFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleToolConfig {
    function_calling_config: GoogleFunctionCallingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleFunctionCallingConfig {
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_function_names: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<GoogleThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleThinkingConfig {
    thinking_budget: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_thoughts: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct GooglePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GoogleFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GoogleFunctionResponse>,
}

impl GooglePart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    fn function_call(call: &ModelToolCall) -> Self {
        Self {
            function_call: Some(GoogleFunctionCall {
                id: Some(call.id.clone()),
                name: Some(call.name.clone()),
                args: Some(call.arguments.clone()),
            }),
            ..Self::default()
        }
    }

    fn function_response(name: &str, response: Value) -> Self {
        Self {
            function_response: Some(GoogleFunctionResponse {
                name: name.to_string(),
                response,
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct GoogleFunctionCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: Option<String>,
    args: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct GoogleFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    usage_metadata: Option<GoogleUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCandidate {
    content: Option<GoogleContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    thoughts_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleApiError,
}

#[derive(Debug, Deserialize)]
struct GoogleApiError {
    code: Option<u16>,
    status: Option<String>,
    message: Option<String>,
}

fn build_request(
    messages: &[ModelMessage],
    tools: &[ModelToolDefinition],
    tool_choice: ModelToolChoice,
    config: &GoogleModelConfig,
) -> GenerateContentRequest {
    let (contents, system_instruction) = to_google_contents(messages);

    let (tools_payload, tool_config) = if tools.is_empty() {
        (None, None)
    } else {
        let declarations = tools
            .iter()
            .map(|tool| GoogleFunctionDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: clean_gemini_schema(tool.parameters.clone()),
            })
            .collect::<Vec<_>>();
        (
            Some(vec![GoogleTool {
                function_declarations: declarations,
            }]),
            Some(GoogleToolConfig {
                function_calling_config: function_calling_config(tool_choice),
            }),
        )
    };

    let thinking_config = config
        .thinking_budget_tokens
        .map(|budget| GoogleThinkingConfig {
            thinking_budget: budget,
            include_thoughts: config.include_thoughts,
        });

    GenerateContentRequest {
        contents,
        system_instruction: system_instruction.map(|instruction| GoogleSystemInstruction {
            parts: vec![GooglePart::text(instruction)],
        }),
        tools: tools_payload,
        tool_config,
        generation_config: Some(GoogleGenerationConfig {
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
            thinking_config,
        }),
    }
}

fn function_calling_config(tool_choice: ModelToolChoice) -> GoogleFunctionCallingConfig {
    let (mode, allowed_function_names) = match tool_choice {
        ModelToolChoice::Auto => ("AUTO", None),
        ModelToolChoice::Required => ("ANY", None),
        ModelToolChoice::None => ("NONE", None),
        ModelToolChoice::Tool(name) => ("ANY", Some(vec![name])),
    };
    GoogleFunctionCallingConfig {
        mode,
        allowed_function_names,
    }
}

fn to_google_contents(messages: &[ModelMessage]) -> (Vec<GoogleContent>, Option<String>) {
    let mut system_lines = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        match message {
            ModelMessage::System(content) => {
                if !content.is_empty() {
                    system_lines.push(content.clone());
                }
            }
            ModelMessage::User(content) => {
                if !content.is_empty() {
                    contents.push(GoogleContent {
                        role: "user".to_string(),
                        parts: vec![GooglePart::text(content.clone())],
                    });
                }
            }
            ModelMessage::Assistant {
                content,
                tool_calls,
            } => {
                let mut parts = Vec::new();
                if let Some(text) = content
                    && !text.is_empty()
                {
                    parts.push(GooglePart::text(text.clone()));
                }
                parts.extend(tool_calls.iter().map(GooglePart::function_call));

                if !parts.is_empty() {
                    contents.push(GoogleContent {
                        role: "model".to_string(),
                        parts,
                    });
                }
            }
            ModelMessage::ToolResult {
                tool_name,
                content,
                is_error,
                ..
            } => {
                let part =
                    GooglePart::function_response(tool_name, tool_result_payload(content, *is_error));
                // Consecutive tool results answer one model turn and share a user turn.
                match contents.last_mut() {
                    Some(last)
                        if last.role == "user"
                            && last.parts.iter().all(|p| p.function_response.is_some()) =>
                    {
                        last.parts.push(part);
                    }
                    _ => contents.push(GoogleContent {
                        role: "user".to_string(),
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    let system = if system_lines.is_empty() {
        None
    } else {
        Some(system_lines.join("\n\n"))
    };

    (contents, system)
}

fn tool_result_payload(content: &str, is_error: bool) -> Value {
    if is_error {
        return json!({"error": content});
    }

    match serde_json::from_str::<Value>(content) {
        Ok(parsed @ Value::Object(_)) => parsed,
        _ => json!({"result": content}),
    }
}

fn normalize_response(response: GenerateContentResponse) -> Result<ModelCompletion, ProviderError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ProviderError::Response(
            "google response missing candidates".to_string(),
        ));
    };

    if let Some(reason) = candidate.finish_reason.as_deref()
        && reason != "STOP"
    {
        debug!(finish_reason = reason, "candidate finished early");
    }

    let mut text_parts = Vec::new();
    let mut thinking_parts = Vec::new();
    let mut tool_calls = Vec::new();

    let parts = candidate.content.map(|content| content.parts).unwrap_or_default();
    for (index, part) in parts.into_iter().enumerate() {
        if let Some(text) = part.text {
            if part.thought.unwrap_or(false) {
                thinking_parts.push(text);
            } else {
                text_parts.push(text);
            }
        }

        if let Some(function_call) = part.function_call {
            let Some(name) = function_call.name else {
                return Err(ProviderError::Response(
                    "google functionCall missing name".to_string(),
                ));
            };

            tool_calls.push(ModelToolCall {
                id: function_call
                    .id
                    .unwrap_or_else(|| format!("call_{}", index + 1)),
                name,
                arguments: function_call.args.unwrap_or_else(|| json!({})),
            });
        }
    }

    let usage = response.usage_metadata.map(|usage| ModelUsage {
        input_tokens: usage.prompt_token_count.unwrap_or(0),
        output_tokens: usage
            .candidates_token_count
            .unwrap_or(0)
            .saturating_add(usage.thoughts_token_count.unwrap_or(0)),
    });

    Ok(ModelCompletion {
        text: join_non_empty(text_parts, "\n"),
        thinking: join_non_empty(thinking_parts, "\n"),
        tool_calls,
        usage,
    })
}

fn join_non_empty(parts: Vec<String>, separator: &str) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(separator))
    }
}

async fn extract_api_error(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(parsed) = serde_json::from_str::<GoogleErrorEnvelope>(&body) {
        let code = parsed.error.code.unwrap_or(status.as_u16());
        let status_name = parsed
            .error
            .status
            .unwrap_or_else(|| status.to_string().to_uppercase());
        let message = parsed
            .error
            .message
            .unwrap_or_else(|| "unknown google api error".to_string());
        return format!("google api error {code} {status_name}: {message}");
    }

    if body.is_empty() {
        format!("google api request failed ({status})")
    } else {
        format!("google api request failed ({status}): {body}")
    }
}

/// Rewrites a JSON schema into the subset Gemini function declarations accept.
fn clean_gemini_schema(schema: Value) -> Value {
    let mut root = schema;
    let defs = match &mut root {
        Value::Object(map) => match map.remove("$defs") {
            Some(Value::Object(defs)) => defs,
            _ => Map::new(),
        },
        _ => Map::new(),
    };

    let resolved = resolve_schema_refs(root, &defs);
    clean_schema_node(resolved, None)
}

fn resolve_schema_refs(value: Value, defs: &Map<String, Value>) -> Value {
    match value {
        Value::Object(map) => {
            let definition = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|reference| reference.rsplit('/').next())
                .and_then(|name| defs.get(name));

            if let Some(definition) = definition {
                let mut resolved = definition.clone();
                if let Value::Object(ref mut resolved_map) = resolved {
                    for (key, value) in map {
                        if key != "$ref" {
                            resolved_map.insert(key, value);
                        }
                    }
                }
                return resolve_schema_refs(resolved, defs);
            }

            Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, resolve_schema_refs(value, defs)))
                    .collect(),
            )
        }
        Value::Array(values) => Value::Array(
            values
                .into_iter()
                .map(|value| resolve_schema_refs(value, defs))
                .collect(),
        ),
        other => other,
    }
}

fn clean_schema_node(value: Value, parent_key: Option<&str>) -> Value {
    match value {
        Value::Object(map) => {
            let mut cleaned = Map::new();

            for (key, value) in map {
                let is_metadata_title = key == "title" && parent_key != Some("properties");
                if key == "additionalProperties" || key == "default" || is_metadata_title {
                    continue;
                }

                let node = clean_schema_node(value, Some(&key));
                cleaned.insert(key, node);
            }

            let is_object = cleaned
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case("object"));
            let has_empty_properties = cleaned
                .get("properties")
                .and_then(Value::as_object)
                .is_some_and(|properties| properties.is_empty());
            if is_object && has_empty_properties {
                cleaned.insert(
                    "properties".to_string(),
                    json!({"_placeholder": {"type": "string"}}),
                );
            }

            Value::Object(cleaned)
        }
        Value::Array(values) => Value::Array(
            values
                .into_iter()
                .map(|value| clean_schema_node(value, parent_key))
                .collect(),
        ),
        other => other,
    }
}
