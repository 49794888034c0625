//! Error types and handling for Relay Core

use crate::orchestration::PartialTrace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Relay Core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// LLM client errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool registration or execution errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Conversation bookkeeping errors
    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    /// Orchestration errors (terminal failures of one query)
    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    /// Structured output decoding errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Trajectory recording errors
    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },
}

/// Model client errors (transport, authentication, protocol)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String },
}

/// Tool registration and execution errors.
///
/// Per-invocation variants are carried inside tool results and fed back to
/// the model, so this type is cloneable and serializable.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    UnknownTool { name: String },

    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },

    #[error("Invalid arguments for {name}: {message}")]
    InvalidArguments { name: String, message: String },

    #[error("Tool execution failed: {name} - {message}")]
    ExecutionFailed { name: String, message: String },

    #[error("Tool timeout: {name} after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("Tool cancelled: {name}")]
    Cancelled { name: String },
}

impl ToolError {
    /// Short machine-readable kind, matching the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool { .. } => "unknown_tool",
            ToolError::DuplicateTool { .. } => "duplicate_tool",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::ExecutionFailed { .. } => "execution_failed",
            ToolError::Timeout { .. } => "timeout",
            ToolError::Cancelled { .. } => "cancelled",
        }
    }

    /// Name of the tool the error refers to
    pub fn tool_name(&self) -> &str {
        match self {
            ToolError::UnknownTool { name }
            | ToolError::DuplicateTool { name }
            | ToolError::InvalidArguments { name, .. }
            | ToolError::ExecutionFailed { name, .. }
            | ToolError::Timeout { name, .. }
            | ToolError::Cancelled { name } => name,
        }
    }

    /// Shorthand for an application-level failure
    pub fn execution_failed<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        ToolError::ExecutionFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an argument mismatch
    pub fn invalid_arguments<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        ToolError::InvalidArguments {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Violations of the conversation's tool-call bookkeeping
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversationError {
    #[error("No pending tool call with id '{id}'")]
    UnknownToolCall { id: String },

    #[error("Tool call '{id}' was already answered")]
    AlreadyAnswered { id: String },

    #[error("{count} tool call(s) still awaiting results")]
    PendingToolCalls { count: usize },
}

/// Terminal failure of one orchestration call, with everything
/// accumulated before it failed.
#[derive(Error, Debug)]
#[error("{kind} (after {} round(s))", .trace.rounds)]
pub struct OrchestrationError {
    pub kind: OrchestrationErrorKind,
    pub trace: PartialTrace,
}

/// What terminated an orchestration call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestrationErrorKind {
    #[error("Maximum rounds exceeded: {max_rounds}")]
    MaxRoundsExceeded { max_rounds: usize },

    #[error("Model client failed: {0}")]
    ModelClient(#[source] LlmError),

    #[error("Orchestration cancelled")]
    Cancelled,

    #[error("Conversation bookkeeping violated: {0}")]
    Conversation(#[source] ConversationError),
}

impl OrchestrationError {
    pub fn new(kind: OrchestrationErrorKind, trace: PartialTrace) -> Self {
        Self { kind, trace }
    }
}

/// Structured output decoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Response is not valid JSON: {message}")]
    Malformed { raw: String, message: String },

    #[error("Schema validation failed at '{field}': {reason}")]
    SchemaValidation { field: String, reason: String },

    #[error("Validated response does not fit the target type: {message}")]
    Type { message: String },

    #[error("Model client failed: {0}")]
    ModelClient(#[from] LlmError),
}

/// Trajectory recording errors
#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("Failed to record trajectory: {message}")]
    RecordingFailed { message: String },

    #[error("Failed to load trajectory: {path}")]
    LoadFailed { path: String },

    #[error("No output file configured")]
    NoOutputFile,
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_string())
    }
}
