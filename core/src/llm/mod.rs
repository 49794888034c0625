//! LLM client abstractions and implementations

pub mod client;
pub mod conversation;
pub mod message;
pub mod mock;
pub mod providers;

pub use client::{
    ChatOptions, FinishReason, LlmClient, LlmResponse, ModelReply, ResponseFormat, Usage,
};
pub use conversation::Conversation;
pub use message::{LlmMessage, MessageRole};
pub use mock::MockLlmClient;
pub use providers::{create_client, OpenAiClient};
