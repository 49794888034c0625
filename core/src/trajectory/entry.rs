//! Trajectory entries

use crate::llm::{ModelReply, Usage};
use crate::tools::{ToolCall, ToolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded event of an orchestration call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    /// When the event happened
    pub timestamp: DateTime<Utc>,

    /// Orchestration call the event belongs to
    pub query_id: String,

    /// What happened
    #[serde(flatten)]
    pub entry_type: EntryType,
}

/// Kinds of recorded events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryType {
    QueryStart {
        query: String,
        max_rounds: usize,
    },
    LlmRequest {
        round: usize,
        message_count: usize,
        tools: Vec<String>,
    },
    LlmResponse {
        round: usize,
        reply: ModelReply,
        usage: Option<Usage>,
    },
    ToolCall {
        round: usize,
        call: ToolCall,
    },
    ToolResult {
        round: usize,
        result: ToolResult,
    },
    QueryComplete {
        success: bool,
        rounds: usize,
        final_response: Option<String>,
        error: Option<String>,
    },
}

impl TrajectoryEntry {
    pub fn new<S: Into<String>>(query_id: S, entry_type: EntryType) -> Self {
        Self {
            timestamp: Utc::now(),
            query_id: query_id.into(),
            entry_type,
        }
    }

    pub fn query_start<S: Into<String>>(query_id: S, query: &str, max_rounds: usize) -> Self {
        Self::new(
            query_id,
            EntryType::QueryStart {
                query: query.to_string(),
                max_rounds,
            },
        )
    }

    pub fn llm_request<S: Into<String>>(
        query_id: S,
        round: usize,
        message_count: usize,
        tools: Vec<String>,
    ) -> Self {
        Self::new(
            query_id,
            EntryType::LlmRequest {
                round,
                message_count,
                tools,
            },
        )
    }

    pub fn llm_response<S: Into<String>>(
        query_id: S,
        round: usize,
        reply: &ModelReply,
        usage: Option<Usage>,
    ) -> Self {
        Self::new(
            query_id,
            EntryType::LlmResponse {
                round,
                reply: reply.clone(),
                usage,
            },
        )
    }

    pub fn tool_call<S: Into<String>>(query_id: S, round: usize, call: &ToolCall) -> Self {
        Self::new(
            query_id,
            EntryType::ToolCall {
                round,
                call: call.clone(),
            },
        )
    }

    pub fn tool_result<S: Into<String>>(query_id: S, round: usize, result: &ToolResult) -> Self {
        Self::new(
            query_id,
            EntryType::ToolResult {
                round,
                result: result.clone(),
            },
        )
    }

    pub fn query_complete<S: Into<String>>(
        query_id: S,
        rounds: usize,
        final_response: Option<String>,
        error: Option<String>,
    ) -> Self {
        Self::new(
            query_id,
            EntryType::QueryComplete {
                success: error.is_none(),
                rounds,
                final_response,
                error,
            },
        )
    }
}
