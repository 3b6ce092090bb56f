//! Turn and ToolInvocation domain types.
//!
//! A conversation is an ordered sequence of turns. Exactly three roles exist
//! on the wire: the user's text, the assistant's replies (which may carry
//! tool invocations instead of text), and tool results linked back to the
//! invocation that produced them. System instructions are not a turn — they
//! travel separately in every provider request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a turn in a conversation. Closed set; the store and the
/// provider wire format both depend on there being no other values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A model-requested call to a named tool with a flat argument map.
///
/// Invocations are produced by the model, never constructed by the loop.
/// `arguments` is the parsed form of the wire JSON string; a malformed
/// argument payload parses to an empty object rather than failing the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Unique invocation ID (matches the provider's tool_call id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value (object with primitive/string/list values)
    pub arguments: serde_json::Value,
}

/// A single turn in a conversation.
///
/// Turns are immutable once appended to the store. An assistant turn carries
/// either final text, tool invocations, or both; a tool turn always carries
/// the result text and the id of the invocation it answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    pub role: Role,

    /// The text content (absent on assistant turns that only request tools)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool invocations requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    /// If this is a tool result, which invocation it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create a final assistant turn carrying only text.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create an assistant turn requesting tool execution. `content` is
    /// whatever text accompanied the request (often none).
    pub fn assistant_tool_calls(content: Option<String>, calls: Vec<ToolInvocation>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: calls,
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create a tool result turn linked to the invocation that produced it.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            created_at: Utc::now(),
        }
    }

    /// Whether this assistant turn requests any tool execution.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_turn() {
        let turn = Turn::user("Find John Smith");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content.as_deref(), Some("Find John Smith"));
        assert!(turn.tool_calls.is_empty());
        assert!(turn.tool_call_id.is_none());
    }

    #[test]
    fn assistant_turn_with_invocations_may_have_no_content() {
        let turn = Turn::assistant_tool_calls(
            None,
            vec![ToolInvocation {
                id: "call_1".into(),
                name: "search_by_word".into(),
                arguments: serde_json::json!({"module": "Leads", "word": "John Smith"}),
            }],
        );
        assert!(turn.content.is_none());
        assert!(turn.has_tool_calls());
    }

    #[test]
    fn tool_result_links_back_to_invocation() {
        let turn = Turn::tool_result("call_1", "Found lead: John Smith (ID: 123)");
        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Assistant, Role::Tool] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("system".parse::<Role>().is_err());
    }

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = Turn::user("Test message");
        let json = serde_json::to_string(&turn).unwrap();
        let deserialized: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content.as_deref(), Some("Test message"));
        assert_eq!(deserialized.role, Role::User);
        // Empty tool_calls are skipped on the wire
        assert!(!json.contains("tool_calls"));
    }
}
