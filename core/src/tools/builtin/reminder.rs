//! Reminder tool (mock scheduling)

use super::parse_arguments;
use crate::error::ToolError;
use crate::schema::{ObjectSchema, Schema};
use crate::tools::{Tool, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const REMINDER_TOOL_NAME: &str = "set_reminder";

#[derive(Debug, Deserialize)]
struct ReminderParams {
    title: String,
    time: String,
    #[serde(default)]
    description: Option<String>,
}

/// Schedules a reminder for the user
#[derive(Debug, Default)]
pub struct ReminderTool;

impl ReminderTool {
    pub fn new() -> Self {
        Self
    }

    fn reminder_id(title: &str, time: &str) -> String {
        let mut hasher = DefaultHasher::new();
        format!("{}:{}", title, time).hash(&mut hasher);
        (hasher.finish() % 10_000).to_string()
    }
}

#[async_trait]
impl ToolHandler for ReminderTool {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: ReminderParams = parse_arguments(REMINDER_TOOL_NAME, arguments)?;
        tracing::info!("Setting reminder: {} at {}", params.title, params.time);

        Ok(json!({
            "reminder_id": Self::reminder_id(&params.title, &params.time),
            "title": params.title,
            "time": params.time,
            "description": params.description.unwrap_or_default(),
            "created_at": Local::now().to_rfc3339(),
            "status": "scheduled",
        }))
    }
}

impl Tool for ReminderTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            REMINDER_TOOL_NAME,
            "Set a reminder for the user",
            ObjectSchema::new()
                .required(
                    "title",
                    Schema::string_with_length(Some(1), None)
                        .describe("The title or subject of the reminder"),
                )
                .required(
                    "time",
                    Schema::string()
                        .describe("The time for the reminder in ISO format (YYYY-MM-DDTHH:MM:SS)"),
                )
                .optional(
                    "description",
                    Schema::string().describe("Optional additional details for the reminder"),
                )
                .into(),
        )
    }
}
