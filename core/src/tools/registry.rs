//! Tool registry for managing available tools

use crate::error::ToolError;
use crate::tools::{Tool, ToolDefinition, ToolHandler};
use std::collections::HashMap;
use std::sync::Arc;

/// A tool as stored in the registry: its definition plus the callable
#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("name", &self.definition.name)
            .finish_non_exhaustive()
    }
}

/// Registry mapping tool names to their definitions and handlers.
///
/// Tools are registered during setup; afterwards the registry is shared
/// read-only (usually behind an `Arc`) by every orchestration call.
/// Definitions are listed in registration order.
#[derive(Default, Debug)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool definition with its handler.
    ///
    /// Fails with [`ToolError::DuplicateTool`] if the name is taken; the
    /// registry is left unchanged in that case.
    pub fn register<H>(&mut self, definition: ToolDefinition, handler: H) -> Result<(), ToolError>
    where
        H: ToolHandler + 'static,
    {
        self.register_shared(definition, Arc::new(handler))
    }

    /// Register a handler that is already shared
    pub fn register_shared(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), ToolError> {
        if self.index.contains_key(&definition.name) {
            return Err(ToolError::DuplicateTool {
                name: definition.name,
            });
        }

        tracing::debug!("Registered tool: {}", definition.name);
        self.index.insert(definition.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            handler,
        });
        Ok(())
    }

    /// Register a tool that carries its own definition
    pub fn register_tool<T>(&mut self, tool: T) -> Result<(), ToolError>
    where
        T: Tool + 'static,
    {
        let definition = tool.definition();
        self.register(definition, tool)
    }

    /// Look a tool up by name
    pub fn lookup(&self, name: &str) -> Result<&RegisteredTool, ToolError> {
        self.index
            .get(name)
            .map(|&position| &self.tools[position])
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    /// Check whether a tool is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All definitions, in registration order
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| tool.definition.clone())
            .collect()
    }

    /// List all tool names, in registration order
    pub fn list_tools(&self) -> Vec<&str> {
        self.tools
            .iter()
            .map(|tool| tool.definition.name.as_str())
            .collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry has no tools
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ObjectSchema, Schema};
    use crate::tools::handler_fn;
    use serde_json::{json, Value};

    fn definition(name: &str, description: &str) -> ToolDefinition {
        ToolDefinition::new(
            name,
            description,
            ObjectSchema::new()
                .required("city", Schema::string())
                .into(),
        )
    }

    fn echo(name: &'static str) -> impl ToolHandler {
        handler_fn(name, |args: Value| async move { Ok::<Value, anyhow::Error>(args) })
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry
            .register(definition("get_weather", "Weather"), echo("get_weather"))
            .unwrap();

        let tool = registry.lookup("get_weather").unwrap();
        assert_eq!(tool.definition.name, "get_weather");
        assert!(registry.contains("get_weather"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("missing").unwrap_err();
        assert_eq!(
            err,
            ToolError::UnknownTool {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_registration_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::new();
        registry
            .register(definition("get_weather", "first"), echo("get_weather"))
            .unwrap();

        let err = registry
            .register(definition("get_weather", "second"), echo("get_weather"))
            .unwrap_err();
        assert_eq!(
            err,
            ToolError::DuplicateTool {
                name: "get_weather".to_string()
            }
        );

        assert_eq!(registry.len(), 1);
        let tool = registry.lookup("get_weather").unwrap();
        assert_eq!(tool.definition.description, "first");
    }

    #[test]
    fn test_definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["get_weather", "check_calendar", "set_reminder"] {
            registry
                .register(definition(name, "tool"), echo("tool"))
                .unwrap();
        }

        let names: Vec<String> = registry
            .list_definitions()
            .into_iter()
            .map(|definition| definition.name)
            .collect();
        assert_eq!(names, vec!["get_weather", "check_calendar", "set_reminder"]);
        assert_eq!(
            registry.list_tools(),
            vec!["get_weather", "check_calendar", "set_reminder"]
        );
    }

    #[tokio::test]
    async fn test_registered_handler_is_callable() {
        let mut registry = ToolRegistry::new();
        registry
            .register(definition("echo", "Echo"), echo("echo"))
            .unwrap();

        let tool = registry.lookup("echo").unwrap();
        let output = tool.handler.call(json!({"city": "Oslo"})).await.unwrap();
        assert_eq!(output, json!({"city": "Oslo"}));
    }

    #[test]
    fn test_registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ToolRegistry>();
    }
}
