//! Tools the agent can call

mod time;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{Error, Result};

pub use time::CurrentTime;

/// A callable tool exposed to the language model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name the model calls
    fn name(&self) -> &str;

    /// What the tool does, shown to the model
    fn description(&self) -> &str;

    /// JSON schema of the arguments
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// Run the tool
    ///
    /// # Errors
    ///
    /// Returns error if the arguments are invalid or the tool fails
    async fn call(&self, arguments: serde_json::Value) -> Result<String>;
}

/// Function-calling tool definition sent with chat requests
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDefinition {
    /// Always `"function"`
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function signature
    pub function: FunctionDefinition,
}

/// Name, description and schema of a callable function
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON schema of the arguments
    pub parameters: serde_json::Value,
}

/// Fixed set of tools available to the agent
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tools
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CurrentTime);
        registry
    }

    /// Add a tool, replacing any existing tool with the same name
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(Arc::new(tool));
    }

    /// Look up a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Registered tool names
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Whether no tools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions for function calling
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                tool_type: "function".to_owned(),
                function: FunctionDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters(),
                },
            })
            .collect()
    }

    /// Execute a tool call by name
    ///
    /// # Errors
    ///
    /// Returns error if the tool is unknown or fails
    pub async fn execute(&self, name: &str, arguments: serde_json::Value) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::Tool(format!("tool not found: {name}")))?;

        tracing::debug!(tool = name, %arguments, "executing tool");
        tool.call(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Repeat the input"
        }

        async fn call(&self, arguments: serde_json::Value) -> Result<String> {
            arguments
                .get("text")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string)
                .ok_or_else(|| Error::Tool("missing text".to_string()))
        }
    }

    #[test]
    fn test_default_registry_has_time_tool() {
        let registry = ToolRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["get_time"]);
        assert!(registry.get("get_time").is_some());
    }

    #[test]
    fn test_definitions_shape() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);

        let json = serde_json::to_value(registry.definitions()).unwrap();
        assert_eq!(json[0]["type"], "function");
        assert_eq!(json[0]["function"]["name"], "echo");
        assert_eq!(json[0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);
        registry.register(Echo);
        assert_eq!(registry.names().len(), 1);
    }

    #[tokio::test]
    async fn test_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);

        let out = registry
            .execute("echo", serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(out, "hi");

        assert!(registry.execute("echo", serde_json::json!({})).await.is_err());
        assert!(matches!(
            registry.execute("missing", serde_json::json!({})).await,
            Err(Error::Tool(_))
        ));
    }
}
