//! Orchestration result structures

use crate::llm::{Conversation, Usage};
use crate::tools::ToolResult;
use serde::Serialize;

/// Outcome of a successful orchestration call
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    /// Final answer text
    pub final_response: String,

    /// Every turn of the call, ending with the final answer
    pub conversation: Conversation,

    /// Number of model calls made
    pub rounds: usize,

    /// Every tool result, in execution order
    pub tool_results: Vec<ToolResult>,

    /// The answer was forced after the round limit was hit
    pub max_rounds_reached: bool,

    /// Token usage summed over all model calls
    pub usage: Usage,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl OrchestrationResult {
    pub fn tool_call_count(&self) -> usize {
        self.tool_results.len()
    }

    /// Tool results whose invocation failed
    pub fn failed_tool_results(&self) -> impl Iterator<Item = &ToolResult> {
        self.tool_results.iter().filter(|result| !result.is_success())
    }
}

/// Everything an orchestration call accumulated before it failed
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartialTrace {
    pub conversation: Conversation,
    pub rounds: usize,
    pub tool_results: Vec<ToolResult>,
    pub usage: Usage,
}
