pub mod prime;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::{SchemaError, ToolError};

pub use prime::{check, is_prime, prime_checking_tool};

type ToolHandler = dyn Fn(Value) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync;

/// A named, schema-declared callable offered to the model.
#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    description: String,
    json_schema: Value,
    handler: Arc<ToolHandler>,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("json_schema", &self.json_schema)
            .finish()
    }
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            json_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": [],
                "additionalProperties": true,
            }),
            handler: Arc::new(|_args| {
                Box::pin(async {
                    Err(ToolError::Execution(
                        "tool handler not configured".to_string(),
                    ))
                })
            }),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Result<Self, SchemaError> {
        validate_schema(&schema)?;
        self.json_schema = schema;
        Ok(self)
    }

    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        self.handler = Arc::new(move |args| Box::pin(handler(args)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn json_schema(&self) -> &Value {
        &self.json_schema
    }

    /// Validates `args` against the declared schema, then runs the handler.
    pub async fn execute(&self, args: Value) -> Result<String, ToolError> {
        validate_arguments(self.name(), &self.json_schema, &args)?;
        (self.handler)(args).await
    }
}

fn validate_schema(schema: &Value) -> Result<(), SchemaError> {
    let schema_obj = schema.as_object().ok_or(SchemaError::SchemaNotObject)?;

    let root_type = schema_obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(SchemaError::RootTypeMustBeObject)?;

    if root_type != "object" {
        return Err(SchemaError::RootTypeMustBeObject);
    }

    if let Some(required) = schema_obj.get("required") {
        let required_arr = required.as_array().ok_or(SchemaError::InvalidRequired)?;
        if required_arr.iter().any(|item| !item.is_string()) {
            return Err(SchemaError::InvalidRequired);
        }
    }

    Ok(())
}

fn validate_arguments(tool_name: &str, schema: &Value, args: &Value) -> Result<(), ToolError> {
    let invalid = |message: String| ToolError::InvalidArguments {
        tool: tool_name.to_string(),
        message,
    };

    let args_obj = args
        .as_object()
        .ok_or_else(|| invalid("arguments must be a JSON object".to_string()))?;

    let schema_obj = schema
        .as_object()
        .ok_or_else(|| invalid("tool schema must be a JSON object".to_string()))?;

    if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
        for field_name in required.iter().filter_map(Value::as_str) {
            if !args_obj.contains_key(field_name) {
                return Err(invalid(format!("missing required field: {field_name}")));
            }
        }
    }

    let properties = schema_obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    if schema_obj
        .get("additionalProperties")
        .and_then(Value::as_bool)
        == Some(false)
    {
        if let Some(key) = args_obj.keys().find(|key| !properties.contains_key(*key)) {
            return Err(invalid(format!("unknown field: {key}")));
        }
    }

    for (key, value) in args_obj {
        let Some(field_schema) = properties.get(key) else {
            continue;
        };

        if let Some(type_name) = field_schema.get("type").and_then(Value::as_str) {
            if !value_matches_type(value, type_name) {
                return Err(invalid(format!("field '{key}' must be of type {type_name}")));
            }
        }

        // Element types are only checked one level deep.
        let item_type = field_schema
            .get("items")
            .and_then(|items| items.get("type"))
            .and_then(Value::as_str);
        if let (Some(items), Some(item_type)) = (value.as_array(), item_type) {
            if let Some(index) = items
                .iter()
                .position(|item| !value_matches_type(item, item_type))
            {
                return Err(invalid(format!(
                    "field '{key}' item {index} must be of type {item_type}"
                )));
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, type_name: &str) -> bool {
    match type_name {
        "string" => value.is_string(),
        "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
        "number" => value.as_f64().is_some(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sum_tool() -> ToolSpec {
        ToolSpec::new("sum", "sum a list")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "values": {"type": "array", "items": {"type": "integer"}}
                },
                "required": ["values"],
                "additionalProperties": false
            }))
            .expect("schema valid")
            .with_handler(|args| async move {
                let total: i64 = args["values"]
                    .as_array()
                    .map(|values| values.iter().filter_map(Value::as_i64).sum())
                    .unwrap_or(0);
                Ok(total.to_string())
            })
    }

    #[test]
    fn schema_validation_rejects_non_object_root() {
        let result = ToolSpec::new("bad", "bad").with_schema(json!({"type": "string"}));
        assert!(matches!(result, Err(SchemaError::RootTypeMustBeObject)));
    }

    #[test]
    fn schema_validation_rejects_non_string_required() {
        let result = ToolSpec::new("bad", "bad").with_schema(json!({
            "type": "object",
            "required": [1]
        }));
        assert!(matches!(result, Err(SchemaError::InvalidRequired)));
    }

    #[tokio::test]
    async fn unconfigured_handler_fails() {
        let err = ToolSpec::new("noop", "nothing")
            .execute(json!({}))
            .await
            .expect_err("should fail");
        assert!(matches!(err, ToolError::Execution(_)));
    }

    #[tokio::test]
    async fn argument_validation_reports_missing_required() {
        let err = sum_tool().execute(json!({})).await.expect_err("should fail");
        assert!(err.to_string().contains("missing required field: values"));
    }

    #[tokio::test]
    async fn argument_validation_rejects_unknown_fields() {
        let err = sum_tool()
            .execute(json!({"values": [], "extra": true}))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("unknown field: extra"));
    }

    #[tokio::test]
    async fn argument_validation_checks_array_items() {
        let err = sum_tool()
            .execute(json!({"values": [1, "2", 3]}))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("item 1 must be of type integer"));

        let err = sum_tool()
            .execute(json!({"values": "1,2,3"}))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("must be of type array"));
    }

    #[tokio::test]
    async fn valid_arguments_reach_handler() {
        let output = sum_tool()
            .execute(json!({"values": [1, 2, 3]}))
            .await
            .expect("tool executes");
        assert_eq!(output, "6");
    }
}
