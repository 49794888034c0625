//! Tool system: definitions, registry, concurrent executor and built-in tools

pub mod base;
pub mod builtin;
pub mod executor;
pub mod registry;

pub use base::{
    handler_fn, FnHandler, Tool, ToolCall, ToolDefinition, ToolHandler, ToolOutcome, ToolResult,
};
pub use builtin::{builtin_registry, register_builtin_tools};
pub use executor::{ExecutorConfig, ToolExecutor, DEFAULT_TOOL_TIMEOUT};
pub use registry::{RegisteredTool, ToolRegistry};
