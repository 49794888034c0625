//! LLM client trait and response structures

use crate::config::ModelParams;
use crate::error::LlmError;
use crate::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

use super::message::LlmMessage;

/// Trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request.
    ///
    /// `tools` may be empty, in which case no tools are advertised.
    async fn chat_completion(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<LlmResponse, LlmError>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// What the model produced for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ModelReply {
    /// A direct answer
    Text(String),

    /// One or more tool invocations, with any accompanying text
    ToolCalls {
        content: String,
        calls: Vec<ToolCall>,
    },
}

impl ModelReply {
    pub fn text<S: Into<String>>(content: S) -> Self {
        ModelReply::Text(content.into())
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        ModelReply::ToolCalls {
            content: String::new(),
            calls,
        }
    }

    /// The text part of the reply
    pub fn content(&self) -> &str {
        match self {
            ModelReply::Text(content) | ModelReply::ToolCalls { content, .. } => content,
        }
    }
}

/// Response from an LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated reply
    pub reply: ModelReply,

    /// Usage statistics
    pub usage: Option<Usage>,

    /// Model used for generation
    pub model: String,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl LlmResponse {
    pub fn new<S: Into<String>>(reply: ModelReply, model: S) -> Self {
        let finish_reason = match &reply {
            ModelReply::Text(_) => FinishReason::Stop,
            ModelReply::ToolCalls { .. } => FinishReason::ToolCalls,
        };
        Self {
            reply,
            usage: None,
            model: model.into(),
            finish_reason: Some(finish_reason),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Usage statistics for a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,

    /// Number of tokens in the completion
    pub completion_tokens: u32,

    /// Total number of tokens
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, other: Usage) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens.saturating_add(other.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(other.completion_tokens),
            total_tokens: self.total_tokens.saturating_add(other.total_tokens),
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Usage) {
        *self = *self + other;
    }
}

/// Reason why generation finished
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Generation completed naturally
    Stop,

    /// Hit the maximum token limit
    Length,

    /// Model decided to call a tool
    ToolCalls,

    /// Content was filtered
    ContentFilter,
}

/// Requested shape of the model's text output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// Options for chat completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Temperature for generation
    pub temperature: Option<f32>,

    /// Top-p sampling parameter
    pub top_p: Option<f32>,

    /// Requested output format
    pub response_format: Option<ResponseFormat>,

    /// Whether the model may request several tools in one turn
    pub parallel_tool_calls: Option<bool>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(4096),
            temperature: Some(0.7),
            top_p: None,
            response_format: None,
            parallel_tool_calls: None,
        }
    }
}

impl ChatOptions {
    /// Override the sampling settings that `params` sets; the rest stay as they are
    pub fn with_params(mut self, params: &ModelParams) -> Self {
        if let Some(max_tokens) = params.max_tokens {
            self.max_tokens = Some(max_tokens);
        }
        if let Some(temperature) = params.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(top_p) = params.top_p {
            self.top_p = Some(top_p);
        }
        self
    }
}

impl From<&ModelParams> for ChatOptions {
    fn from(params: &ModelParams) -> Self {
        ChatOptions::default().with_params(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_sum_saturates() {
        let total = Usage::new(u32::MAX - 1, 0) + Usage::new(10, 10);
        assert_eq!(total.prompt_tokens, u32::MAX);
        assert_eq!(total.completion_tokens, 10);
        assert_eq!(total.total_tokens, u32::MAX);
    }

    #[test]
    fn test_model_params_override_defaults() {
        let params = ModelParams {
            max_tokens: None,
            temperature: Some(0.1),
            top_p: Some(0.9),
        };
        let options = ChatOptions::from(&params);
        assert_eq!(options.temperature, Some(0.1));
        assert_eq!(options.top_p, Some(0.9));
        assert_eq!(options.max_tokens, Some(4096));

        let decode = ChatOptions {
            max_tokens: Some(1000),
            ..ChatOptions::default()
        }
        .with_params(&params);
        assert_eq!(decode.max_tokens, Some(1000));
        assert_eq!(decode.temperature, Some(0.1));
    }

    #[test]
    fn test_usage_sums() {
        let mut total = Usage::default();
        total += Usage::new(10, 5);
        total += Usage::new(7, 3);
        assert_eq!(total, Usage::new(17, 8));
        assert_eq!(total.total_tokens, 25);
    }

    #[test]
    fn test_reply_finish_reason() {
        let response = LlmResponse::new(ModelReply::text("done"), "gpt-4o");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.reply.content(), "done");

        let call = ToolCall::with_id("call_1", "get_weather", json!({}));
        let response = LlmResponse::new(ModelReply::tool_calls(vec![call]), "gpt-4o");
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(response.reply.content(), "");
    }
}
