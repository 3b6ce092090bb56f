//! ModelProvider trait — the abstraction over LLM backends.
//!
//! A provider knows how to send the working conversation to an LLM and get
//! back either a final text answer or a batch of tool invocations. The two
//! shapes must be distinguishable: an empty `tool_calls` list means the turn
//! is finished.
//!
//! Implementations: OpenAI-compatible chat-completions endpoints
//! (OpenRouter, OpenAI, local gateways).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::turn::{ToolInvocation, Turn};

/// One completion request: system instructions, the full working turn list,
/// and the static tool catalogue. The model/temperature/token knobs are
/// provider construction-time configuration, not per-request state.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instructions, prepended by the transport (never a stored turn)
    pub system_prompt: String,

    /// The working conversation, oldest first
    pub turns: Vec<Turn>,

    /// Tools the model may call, supplied verbatim on every request
    pub tools: Vec<ToolDefinition>,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A complete response from a provider.
///
/// Exactly one of two shapes:
/// - terminal: `tool_calls` empty, `content` is the final answer text;
/// - tool request: `tool_calls` non-empty, `content` optional commentary.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The generated text, if any
    pub content: Option<String>,

    /// Tool invocations the model wants executed, in emission order
    pub tool_calls: Vec<ToolInvocation>,
}

impl CompletionResponse {
    /// Whether this response ends the turn (no tool invocations requested).
    pub fn is_terminal(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// The core ModelProvider trait.
///
/// The loop controller calls `complete()` without knowing which backend is
/// configured. Any raised error is fatal to the current turn; retry policy,
/// if any, belongs to the implementation.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;
}
