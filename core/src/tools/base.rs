//! Base tool traits and structures

use crate::error::ToolError;
use crate::schema::Schema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::marker::PhantomData;
use uuid::Uuid;

/// The callable half of a tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with already-validated arguments
    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// A tool that carries its own definition.
///
/// Implement this for tools that are types of their own; plain closures can
/// be registered through [`handler_fn`] together with a [`ToolDefinition`].
pub trait Tool: ToolHandler {
    /// Get the declarative definition of the tool
    fn definition(&self) -> ToolDefinition;
}

/// Declarative description of a tool, advertised to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    /// Unique name of the tool
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// Shape of the arguments the tool accepts
    pub parameters: Schema,
}

impl ToolDefinition {
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        description: D,
        parameters: Schema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// JSON schema of the parameters
    pub fn parameters_json(&self) -> Value {
        self.parameters.to_json_schema()
    }
}

/// A call to a tool, as requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Arguments to pass to the tool
    pub arguments: Value,
}

impl ToolCall {
    /// Create a tool call with a generated id
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }

    /// Create a tool call with a known id
    pub fn with_id<I: Into<String>, S: Into<String>>(id: I, name: S, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(Value),
    Failure(ToolError),
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is a result for
    pub tool_call_id: String,

    /// Name of the tool that was requested
    pub tool_name: String,

    /// What the invocation produced
    pub outcome: ToolOutcome,

    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(call: &ToolCall, value: Value) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            outcome: ToolOutcome::Success(value),
            duration_ms: 0,
        }
    }

    /// Create an error result
    pub fn failure(call: &ToolCall, error: ToolError) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            outcome: ToolOutcome::Failure(error),
            duration_ms: 0,
        }
    }

    /// Set execution duration
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&ToolError> {
        match &self.outcome {
            ToolOutcome::Success(_) => None,
            ToolOutcome::Failure(error) => Some(error),
        }
    }

    /// Text sent back to the model as the tool turn's content.
    ///
    /// Failures become an `{"error": {...}}` object so the model can see what
    /// went wrong and react to it.
    pub fn to_message_content(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success(Value::String(text)) => text.clone(),
            ToolOutcome::Success(value) => value.to_string(),
            ToolOutcome::Failure(error) => json!({
                "error": {
                    "kind": error.kind(),
                    "message": error.to_string(),
                }
            })
            .to_string(),
        }
    }
}

/// Adapter turning an async closure into a [`ToolHandler`]
pub struct FnHandler<F, Fut> {
    name: String,
    func: F,
    _marker: PhantomData<fn() -> Fut>,
}

/// Wrap an async closure as a tool handler.
///
/// The closure returns `anyhow::Result<Value>`. A returned [`ToolError`] is
/// passed through unchanged; any other error is reported as
/// [`ToolError::ExecutionFailed`] under `name`.
pub fn handler_fn<N, F, Fut>(name: N, func: F) -> FnHandler<F, Fut>
where
    N: Into<String>,
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    FnHandler {
        name: name.into(),
        func,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F, Fut>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        (self.func)(arguments)
            .await
            .map_err(|error| match error.downcast::<ToolError>() {
                Ok(tool_error) => tool_error,
                Err(other) => ToolError::execution_failed(&self.name, format!("{:#}", other)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_ids_are_unique() {
        let a = ToolCall::new("get_weather", json!({}));
        let b = ToolCall::new("get_weather", json!({}));
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("call_"));
    }

    #[test]
    fn test_success_content_is_json() {
        let call = ToolCall::with_id("1", "get_weather", json!({}));
        let result = ToolResult::success(&call, json!({"temp": 15}));
        assert_eq!(result.to_message_content(), r#"{"temp":15}"#);
    }

    #[test]
    fn test_string_success_is_sent_verbatim() {
        let call = ToolCall::with_id("1", "echo", json!({}));
        let result = ToolResult::success(&call, json!("plain text"));
        assert_eq!(result.to_message_content(), "plain text");
    }

    #[test]
    fn test_failure_content_names_kind() {
        let call = ToolCall::with_id("1", "nope", json!({}));
        let result = ToolResult::failure(
            &call,
            ToolError::UnknownTool {
                name: "nope".into(),
            },
        );
        let content: Value = serde_json::from_str(&result.to_message_content()).unwrap();
        assert_eq!(content["error"]["kind"], "unknown_tool");
        assert_eq!(content["error"]["message"], "Tool not found: nope");
        assert!(!result.is_success());
    }

    #[test]
    fn test_fn_handler_wraps_plain_errors() {
        let handler = handler_fn("flaky", |_args| async {
            Err::<Value, _>(anyhow::anyhow!("boom"))
        });
        let err = tokio_test::block_on(handler.call(json!({}))).unwrap_err();
        assert_eq!(err, ToolError::execution_failed("flaky", "boom"));
    }

    #[test]
    fn test_fn_handler_passes_tool_errors_through() {
        let handler = handler_fn("strict", |_args| async {
            Err::<Value, _>(ToolError::invalid_arguments("strict", "bad date").into())
        });
        let err = tokio_test::block_on(handler.call(json!({}))).unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
    }
}
