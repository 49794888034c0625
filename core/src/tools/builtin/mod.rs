//! Built-in demonstration tools

pub mod calendar;
pub mod datetime;
pub mod reminder;
pub mod weather;

pub use calendar::CalendarTool;
pub use datetime::DateTimeTool;
pub use reminder::ReminderTool;
pub use weather::WeatherTool;

use crate::error::ToolError;
use crate::tools::ToolRegistry;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Register every built-in tool, in a stable order
pub fn register_builtin_tools(registry: &mut ToolRegistry) -> Result<(), ToolError> {
    registry.register_tool(WeatherTool::new())?;
    registry.register_tool(CalendarTool::new())?;
    registry.register_tool(ReminderTool::new())?;
    registry.register_tool(DateTimeTool::new())?;
    Ok(())
}

/// A registry holding only the built-in tools
pub fn builtin_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry)?;
    Ok(registry)
}

/// Deserialize validated tool arguments into a typed parameter struct
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    tool_name: &str,
    arguments: Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::invalid_arguments(tool_name, e.to_string()))
}
