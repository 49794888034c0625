//! Concrete model client implementations

pub mod openai;

pub use openai::{create_client, OpenAiClient};
