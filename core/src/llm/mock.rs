//! Scripted LLM client for tests and offline demos.
//!
//! [`MockLlmClient`] pops one queued outcome per request and records every
//! request it receives, so tests can assert on exactly what the caller sent.

use super::client::{ChatOptions, LlmClient, LlmResponse, ModelReply, Usage};
use super::message::LlmMessage;
use crate::error::LlmError;
use crate::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A request as seen by the mock client
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<LlmMessage>,
    pub tools: Vec<ToolDefinition>,
    pub options: ChatOptions,
}

impl RecordedRequest {
    /// Names of the advertised tools
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name.as_str()).collect()
    }
}

/// Queue-based fake model client.
///
/// When the queue runs dry every further request fails with
/// [`LlmError::InvalidResponse`].
#[derive(Debug)]
pub struct MockLlmClient {
    model: String,
    script: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Option<Duration>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Delay every reply, to exercise cancellation and deadlines
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, response: LlmResponse) -> &Self {
        self.lock_script().push_back(Ok(response));
        self
    }

    /// Queue a plain text answer
    pub fn queue_text<S: Into<String>>(&self, content: S) -> &Self {
        self.queue_response(
            LlmResponse::new(ModelReply::text(content), self.model.clone())
                .with_usage(Usage::new(10, 5)),
        )
    }

    /// Queue a reply requesting the given tool invocations
    pub fn queue_tool_calls(&self, calls: Vec<ToolCall>) -> &Self {
        self.queue_response(
            LlmResponse::new(ModelReply::tool_calls(calls), self.model.clone())
                .with_usage(Usage::new(10, 5)),
        )
    }

    pub fn queue_error(&self, error: LlmError) -> &Self {
        self.lock_script().push_back(Err(error));
        self
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .map(|requests| requests.len())
            .unwrap_or_default()
    }

    /// Outcomes still queued
    pub fn remaining(&self) -> usize {
        self.lock_script().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<LlmResponse, LlmError>>> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn chat_completion(
        &self,
        messages: &[LlmMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<LlmResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tools: tools.to_vec(),
                options: options.clone(),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.lock_script().pop_front().unwrap_or_else(|| {
            Err(LlmError::InvalidResponse {
                message: "mock client has no scripted reply left".to_string(),
            })
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replies_in_order_and_records_requests() {
        let mock = MockLlmClient::new();
        mock.queue_tool_calls(vec![ToolCall::with_id("call_1", "get_weather", json!({}))])
            .queue_text("done");

        let messages = vec![LlmMessage::user("hi")];
        let first = mock
            .chat_completion(&messages, &[], &ChatOptions::default())
            .await
            .unwrap();
        assert!(matches!(first.reply, ModelReply::ToolCalls { .. }));

        let second = mock
            .chat_completion(&messages, &[], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(second.reply, ModelReply::text("done"));

        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.requests()[0].messages, messages);
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let mock = MockLlmClient::new();
        let err = mock
            .chat_completion(&[], &[], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }
}
