//! Weather lookup tool (mock data)

use super::parse_arguments;
use crate::error::ToolError;
use crate::schema::{ObjectSchema, Schema};
use crate::tools::{Tool, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};

pub const WEATHER_TOOL_NAME: &str = "get_weather";

#[derive(Debug, Deserialize)]
struct WeatherParams {
    location: String,
    #[serde(default)]
    unit: Option<TemperatureUnit>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    fn as_str(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }
}

/// Current weather for a location
#[derive(Debug, Default)]
pub struct WeatherTool;

impl WeatherTool {
    pub fn new() -> Self {
        Self
    }

    /// (celsius, fahrenheit, condition) for a location
    fn lookup(location: &str) -> (i64, i64, &'static str) {
        let location = location.to_lowercase();
        if location.contains("london") {
            (15, 59, "Rainy")
        } else if location.contains("tokyo") {
            (20, 68, "Clear")
        } else if location.contains("new york") {
            (22, 72, "Partly Cloudy")
        } else {
            (25, 77, "Sunny")
        }
    }
}

#[async_trait]
impl ToolHandler for WeatherTool {
    async fn call(&self, arguments: Value) -> Result<Value, ToolError> {
        let params: WeatherParams = parse_arguments(WEATHER_TOOL_NAME, arguments)?;
        let unit = params.unit.unwrap_or_default();
        tracing::info!("Getting weather for {} in {}", params.location, unit.as_str());

        let (celsius, fahrenheit, condition) = Self::lookup(&params.location);
        let temperature = match unit {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => fahrenheit,
        };

        Ok(json!({
            "location": params.location,
            "temperature": temperature,
            "unit": unit.as_str(),
            "condition": condition,
            "humidity": 65,
            "wind_speed": 10,
            "updated_at": Local::now().to_rfc3339(),
        }))
    }
}

impl Tool for WeatherTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            WEATHER_TOOL_NAME,
            "Get the current weather for a specific location",
            ObjectSchema::new()
                .required(
                    "location",
                    Schema::string().describe(
                        "The city and state or country, e.g., 'San Francisco, CA' or 'Paris, France'",
                    ),
                )
                .optional(
                    "unit",
                    Schema::enumeration(["celsius", "fahrenheit"])
                        .describe("The temperature unit to use"),
                )
                .into(),
        )
    }
}
