//! # relay Core
//!
//! Core library for relay: multi-turn tool-calling conversations with an LLM
//! and schema-checked structured output.
//!
//! The [`Orchestrator`] sends the conversation to the model, runs the tool
//! calls it requests through a shared [`ToolRegistry`], feeds the results
//! back, and repeats until the model answers or the round limit is hit.

// Core modules
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestration;
pub mod schema;
pub mod structured;
pub mod tools;
pub mod trajectory;

// Re-export commonly used types
pub use config::{ModelParams, Protocol, ResolvedLlmConfig};
pub use error::{Error, Result};
pub use llm::{create_client, LlmClient};
pub use orchestration::{
    LimitPolicy, OrchestrationResult, Orchestrator, OrchestratorBuilder, QueryOptions,
};
pub use schema::{ObjectSchema, Schema};
pub use structured::{StructuredDecoder, StructuredOutput, StructuredResponse};
pub use tools::{ToolDefinition, ToolRegistry};
pub use trajectory::TrajectoryRecorder;

/// Current version of the relay-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the library
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Initialize tracing with a specific debug mode
pub fn init_tracing_with_debug(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}
