//! The Tool trait — one implementation per operation the model may call.
//!
//! Handlers render their result as compact plain text for the model, never
//! raw structured data. Errors stay inside `ToolError`; the dispatch
//! boundary (in the tools crate) converts them to strings so the loop
//! controller never sees a failure from tool execution.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A tool the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (what the model calls it by).
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments (a flat JSON object).
    /// Returns the rendered result text.
    async fn execute(&self, arguments: Value) -> Result<String, ToolError>;

    /// The catalogue entry sent to the model for this tool.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Pull a required string argument out of a tool's argument object.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing required argument: {key}")))
}

/// Pull an optional string argument.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Pull an optional positive integer argument, with a default.
pub fn int_or(args: &Value, key: &str, default: u64) -> u64 {
    args.get(key).and_then(Value::as_u64).unwrap_or(default)
}
