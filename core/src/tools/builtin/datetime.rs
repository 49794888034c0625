//! Current date and time tool

use super::parse_arguments;
use crate::error::ToolError;
use crate::schema::{ObjectSchema, Schema};
use crate::tools::{Tool, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const DATETIME_TOOL_NAME: &str = "get_datetime";

#[derive(Debug, Deserialize)]
struct DateTimeParams {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Full,
    Date,
    Time,
    Iso,
}

impl OutputFormat {
    /// Unrecognized formats fall back to `Full`
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_lowercase).as_deref() {
            Some("date") => OutputFormat::Date,
            Some("time") => OutputFormat::Time,
            Some("iso") => OutputFormat::Iso,
            _ => OutputFormat::Full,
        }
    }
}

/// Parse `UTC`, `Z`, `+05:30`, `UTC-8` style zone names into a fixed offset.
///
/// IANA names such as `Europe/Paris` are resolved through `chrono_tz` first.
fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let zone = zone.trim();
    let upper = zone.to_uppercase();
    if upper == "UTC" || upper == "GMT" || upper == "Z" {
        return FixedOffset::east_opt(0);
    }

    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper);
    let (sign, digits) = match rest.chars().next()? {
        '+' => (1, &rest[1..]),
        '-' => (-1, &rest[1..]),
        _ => return None,
    };
    if !digits.is_ascii() {
        return None;
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None if digits.len() == 4 => (digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        None => (digits.parse::<i32>().ok()?, 0),
    };
    if hours > 14 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn render<Z>(now: DateTime<Z>, timezone: &str, format: OutputFormat) -> Value
where
    Z: TimeZone,
    Z::Offset: std::fmt::Display,
{
    let date = now.format("%Y-%m-%d").to_string();
    let time = now.format("%H:%M:%S").to_string();
    let (date, time) = match format {
        OutputFormat::Date => (Value::String(date), Value::Null),
        OutputFormat::Time => (Value::Null, Value::String(time)),
        OutputFormat::Full | OutputFormat::Iso => (Value::String(date), Value::String(time)),
    };

    let mut response = Map::new();
    response.insert("timezone".to_string(), json!(timezone));
    response.insert("date".to_string(), date);
    response.insert("time".to_string(), time);
    response.insert("weekday".to_string(), json!(now.format("%A").to_string()));
    response.insert("timestamp".to_string(), json!(now.timestamp()));
    if format == OutputFormat::Iso {
        response.insert("iso_format".to_string(), json!(now.to_rfc3339()));
    }
    Value::Object(response)
}

/// Reports the current date and time, optionally in a given zone
#[derive(Debug, Default)]
pub struct DateTimeTool;

impl DateTimeTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolHandler for DateTimeTool {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: DateTimeParams = parse_arguments(DATETIME_TOOL_NAME, arguments)?;
        let format = OutputFormat::parse(params.format.as_deref());
        tracing::info!(
            "Getting datetime information for timezone: {:?}, format: {:?}",
            params.timezone,
            format
        );

        let output = match params.timezone.as_deref().filter(|zone| !zone.is_empty()) {
            None => render(Local::now(), "Local", format),
            Some(zone) => match (zone.trim().parse::<Tz>(), parse_offset(zone)) {
                (Ok(tz), _) => render(Utc::now().with_timezone(&tz), tz.name(), format),
                (Err(_), Some(offset)) => {
                    render(Utc::now().with_timezone(&offset), zone, format)
                }
                (Err(_), None) => {
                    tracing::warn!("Unknown timezone: {}, using UTC", zone);
                    render(Utc::now(), "UTC", format)
                }
            },
        };
        Ok(output)
    }
}

impl Tool for DateTimeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            DATETIME_TOOL_NAME,
            "Get the current date and time, optionally in a specific timezone",
            ObjectSchema::new()
                .optional(
                    "timezone",
                    Schema::string()
                        .describe(
                            "The timezone, either an IANA name such as 'America/New_York' \
                             or a UTC offset such as '+09:00' or 'UTC-5'",
                        ),
                )
                .optional(
                    "format",
                    Schema::enumeration(["full", "date", "time", "iso"])
                        .describe("The output format"),
                )
                .into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("UTC"), FixedOffset::east_opt(0));
        assert_eq!(parse_offset("+05:30"), FixedOffset::east_opt(5 * 3600 + 1800));
        assert_eq!(parse_offset("UTC-8"), FixedOffset::west_opt(8 * 3600));
        assert_eq!(parse_offset("gmt+0100"), FixedOffset::east_opt(3600));
        assert_eq!(parse_offset("Mars/Olympus"), None);
        assert_eq!(parse_offset("+25:00"), None);
    }

    #[test]
    fn test_parse_offset_rejects_multibyte_digits() {
        assert_eq!(parse_offset("+1é1"), None);
        assert_eq!(parse_offset("UTC+0é"), None);
    }

    #[tokio::test]
    async fn test_multibyte_zone_falls_back_without_panicking() {
        let output = DateTimeTool::new()
            .call(json!({"timezone": "+1é1"}))
            .await
            .unwrap();
        assert_eq!(output["timezone"], "UTC");
    }

    #[tokio::test]
    async fn test_named_zone_uses_its_offset() {
        let output = DateTimeTool::new()
            .call(json!({"timezone": "Asia/Kolkata", "format": "iso"}))
            .await
            .unwrap();
        assert_eq!(output["timezone"], "Asia/Kolkata");
        assert!(output["iso_format"].as_str().unwrap().ends_with("+05:30"));
    }

    #[tokio::test]
    async fn test_named_zone_with_daylight_saving() {
        let output = DateTimeTool::new()
            .call(json!({"timezone": "America/New_York", "format": "iso"}))
            .await
            .unwrap();
        assert_eq!(output["timezone"], "America/New_York");
        let iso = output["iso_format"].as_str().unwrap();
        assert!(iso.ends_with("-05:00") || iso.ends_with("-04:00"));
    }

    #[tokio::test]
    async fn test_date_format_omits_time() {
        let output = DateTimeTool::new()
            .call(json!({"timezone": "UTC", "format": "date"}))
            .await
            .unwrap();
        assert_eq!(output["timezone"], "UTC");
        assert!(output["date"].is_string());
        assert!(output["time"].is_null());
        assert!(output.get("iso_format").is_none());
    }

    #[tokio::test]
    async fn test_iso_format_includes_iso_string() {
        let output = DateTimeTool::new()
            .call(json!({"timezone": "+09:00", "format": "iso"}))
            .await
            .unwrap();
        assert!(output["iso_format"].as_str().unwrap().ends_with("+09:00"));
    }

    #[tokio::test]
    async fn test_unknown_zone_falls_back_to_utc() {
        let output = DateTimeTool::new()
            .call(json!({"timezone": "Mars/Olympus"}))
            .await
            .unwrap();
        assert_eq!(output["timezone"], "UTC");
        assert!(output["time"].is_string());
    }

    #[tokio::test]
    async fn test_no_zone_uses_local_time() {
        let output = DateTimeTool::new().call(json!({})).await.unwrap();
        assert_eq!(output["timezone"], "Local");
    }
}
