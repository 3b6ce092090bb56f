//! Tool registry and the never-raise dispatch boundary.
//!
//! The loop controller calls `dispatch` and always gets a string back.
//! Unknown names and handler failures become plain text the model can read
//! and react to; nothing from tool execution escapes as an error.

use std::collections::HashMap;

use crmpilot_core::provider::ToolDefinition;
use crmpilot_core::tool::Tool;
use serde_json::Value;
use tracing::warn;

/// A registry of available tools.
///
/// The loop controller uses this to:
/// 1. Get tool definitions to send to the model
/// 2. Dispatch invocations when the model requests them
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Execute an invocation. Never fails: unknown tools and handler errors
    /// are rendered as text for the model.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!("Unknown tool: {name}");
        };
        match tool.execute(arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool execution failed");
                format!("Error executing {name}: {e}")
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
