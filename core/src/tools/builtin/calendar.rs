//! Calendar lookup tool (mock data)

use super::parse_arguments;
use crate::error::ToolError;
use crate::schema::{ObjectSchema, Schema};
use crate::tools::{Tool, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};

pub const CALENDAR_TOOL_NAME: &str = "check_calendar";

#[derive(Debug, Deserialize)]
struct CalendarParams {
    date: String,
}

/// Events on the user's calendar for a given day
#[derive(Debug, Default)]
pub struct CalendarTool;

impl CalendarTool {
    pub fn new() -> Self {
        Self
    }

    fn events_on(date: NaiveDate, today: NaiveDate) -> Vec<Value> {
        if date == today {
            vec![
                json!({"time": "09:00-10:00", "title": "Team meeting"}),
                json!({"time": "12:00-13:00", "title": "Lunch with client"}),
                json!({"time": "15:00-16:30", "title": "Project review"}),
            ]
        } else if Some(date) == today.checked_add_days(Days::new(1)) {
            vec![
                json!({"time": "11:00-12:00", "title": "Dentist appointment"}),
                json!({"time": "14:00-15:00", "title": "Weekly sync"}),
            ]
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl ToolHandler for CalendarTool {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: CalendarParams = parse_arguments(CALENDAR_TOOL_NAME, arguments)?;
        tracing::info!("Checking calendar for date: {}", params.date);

        let date = NaiveDate::parse_from_str(&params.date, "%Y-%m-%d").map_err(|_| {
            ToolError::invalid_arguments(
                CALENDAR_TOOL_NAME,
                format!("'{}' is not a date in YYYY-MM-DD format", params.date),
            )
        })?;

        let events = Self::events_on(date, Local::now().date_naive());
        Ok(json!({
            "date": params.date,
            "total_events": events.len(),
            "events": events,
        }))
    }
}

impl Tool for CalendarTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            CALENDAR_TOOL_NAME,
            "Check the user's calendar for events on a specific date",
            ObjectSchema::new()
                .required(
                    "date",
                    Schema::string_with_length(Some(10), Some(10))
                        .describe("The date to check, in ISO format (YYYY-MM-DD)"),
                )
                .into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_today_has_three_events() {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let output = CalendarTool::new()
            .call(json!({"date": today}))
            .await
            .unwrap();
        assert_eq!(output["total_events"], 3);
        assert_eq!(output["events"][0]["title"], "Team meeting");
    }

    #[test]
    fn test_tomorrow_and_other_days() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(CalendarTool::events_on(tomorrow, today).len(), 2);
        assert!(CalendarTool::events_on(later, today).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_date_is_invalid_arguments() {
        let err = CalendarTool::new()
            .call(json!({"date": "next tuesday"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
    }
}
