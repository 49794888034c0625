//! Append-only conversation with tool-call bookkeeping

use super::message::{LlmMessage, MessageRole};
use crate::error::ConversationError;
use crate::tools::{ToolCall, ToolResult};
use serde::Serialize;

/// Ordered turns of one orchestration call.
///
/// Turns can only be appended. Every tool invocation requested by the latest
/// assistant turn must be answered by exactly one tool turn before anything
/// else is appended; [`Conversation::is_ready`] reports whether the
/// conversation can be sent to the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conversation {
    messages: Vec<LlmMessage>,
    #[serde(skip)]
    requested: Vec<String>,
    #[serde(skip)]
    pending: Vec<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with an optional system prompt and a user message
    pub fn seeded(system_prompt: Option<&str>, user_message: &str) -> Self {
        let mut conversation = Self::new();
        if let Some(prompt) = system_prompt.filter(|prompt| !prompt.trim().is_empty()) {
            conversation.messages.push(LlmMessage::system(prompt));
        }
        conversation.messages.push(LlmMessage::user(user_message));
        conversation
    }

    pub fn push_system<S: Into<String>>(&mut self, content: S) -> Result<(), ConversationError> {
        self.ensure_ready()?;
        self.messages.push(LlmMessage::system(content));
        Ok(())
    }

    pub fn push_user<S: Into<String>>(&mut self, content: S) -> Result<(), ConversationError> {
        self.ensure_ready()?;
        self.messages.push(LlmMessage::user(content));
        Ok(())
    }

    /// Append a plain assistant answer
    pub fn push_assistant<S: Into<String>>(&mut self, content: S) -> Result<(), ConversationError> {
        self.ensure_ready()?;
        self.messages.push(LlmMessage::assistant(content));
        Ok(())
    }

    /// Append an assistant turn requesting tool invocations.
    ///
    /// The invocations become pending until answered with
    /// [`Conversation::push_tool_result`].
    pub fn push_tool_calls<S: Into<String>>(
        &mut self,
        content: S,
        calls: Vec<ToolCall>,
    ) -> Result<(), ConversationError> {
        self.ensure_ready()?;
        self.requested = calls.iter().map(|call| call.id.clone()).collect();
        self.pending = self.requested.clone();
        self.messages
            .push(LlmMessage::assistant_with_tools(content, calls));
        Ok(())
    }

    /// Answer a pending invocation with raw text
    pub fn push_tool_message<I: Into<String>, S: Into<String>>(
        &mut self,
        tool_call_id: I,
        content: S,
    ) -> Result<(), ConversationError> {
        let id = tool_call_id.into();
        match self.pending.iter().position(|pending| *pending == id) {
            Some(position) => {
                self.pending.remove(position);
                self.messages.push(LlmMessage::tool(id, content));
                Ok(())
            }
            None if self.requested.contains(&id) => Err(ConversationError::AlreadyAnswered { id }),
            None => Err(ConversationError::UnknownToolCall { id }),
        }
    }

    /// Answer a pending invocation with a tool result
    pub fn push_tool_result(&mut self, result: &ToolResult) -> Result<(), ConversationError> {
        self.push_tool_message(result.tool_call_id.clone(), result.to_message_content())
    }

    /// No invocation is waiting for a result
    pub fn is_ready(&self) -> bool {
        self.pending.is_empty()
    }

    /// Ids of invocations still waiting for a result, in request order
    pub fn pending_tool_calls(&self) -> &[String] {
        &self.pending
    }

    fn ensure_ready(&self) -> Result<(), ConversationError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(ConversationError::PendingToolCalls {
                count: self.pending.len(),
            })
        }
    }

    pub fn messages(&self) -> &[LlmMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<LlmMessage> {
        self.messages
    }

    pub fn last(&self) -> Option<&LlmMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of turns with the given role
    pub fn count_role(&self, role: MessageRole) -> usize {
        self.messages
            .iter()
            .filter(|message| message.role == role)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_calls() -> Vec<ToolCall> {
        vec![
            ToolCall::with_id("call_a", "get_weather", json!({"location": "London"})),
            ToolCall::with_id("call_b", "get_weather", json!({"location": "Paris"})),
        ]
    }

    #[test]
    fn test_seeded_skips_blank_system_prompt() {
        let conversation = Conversation::seeded(Some("  "), "hello");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, MessageRole::User);

        let conversation = Conversation::seeded(Some("Be brief"), "hello");
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].role, MessageRole::System);
    }

    #[test]
    fn test_pending_calls_block_other_turns() {
        let mut conversation = Conversation::seeded(None, "weather?");
        conversation.push_tool_calls("", two_calls()).unwrap();
        assert!(!conversation.is_ready());
        assert_eq!(conversation.pending_tool_calls(), ["call_a", "call_b"]);

        let err = conversation.push_user("hurry up").unwrap_err();
        assert_eq!(err, ConversationError::PendingToolCalls { count: 2 });

        conversation.push_tool_message("call_b", "rain").unwrap();
        conversation.push_tool_message("call_a", "sun").unwrap();
        assert!(conversation.is_ready());
        conversation.push_assistant("Rain in Paris, sun in London").unwrap();
        assert_eq!(conversation.len(), 5);
    }

    #[test]
    fn test_answers_must_match_pending_invocations() {
        let mut conversation = Conversation::seeded(None, "weather?");
        conversation.push_tool_calls("", two_calls()).unwrap();

        let err = conversation.push_tool_message("call_x", "?").unwrap_err();
        assert_eq!(
            err,
            ConversationError::UnknownToolCall {
                id: "call_x".to_string()
            }
        );

        conversation.push_tool_message("call_a", "sun").unwrap();
        let err = conversation.push_tool_message("call_a", "sun").unwrap_err();
        assert_eq!(
            err,
            ConversationError::AlreadyAnswered {
                id: "call_a".to_string()
            }
        );
    }

    #[test]
    fn test_serializes_as_message_list() {
        let conversation = Conversation::seeded(None, "hi");
        let value = serde_json::to_value(&conversation).unwrap();
        assert_eq!(value, json!({"messages": [{"role": "user", "content": "hi"}]}));
    }
}
