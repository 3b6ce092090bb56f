//! ConversationStore trait — the persistence contract the loop depends on.
//!
//! The loop controller reads the most recent window of turns before each
//! user turn and writes back everything it generated in one ordered batch.
//! The store must preserve insertion order on read-back; beyond that it is
//! free to prune by age or explicit clear.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::turn::Turn;

/// Opaque user identity key. Whatever the transport layer uses to identify
/// a chat (a Telegram chat id, a CLI session name) — the store does not
/// interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Ordered, append-only turn storage keyed by user identity.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load the most recent `limit` turns for a user, oldest first.
    async fn load(&self, user: &UserId, limit: usize) -> Result<Vec<Turn>, StoreError>;

    /// Append a batch of turns for a user as one logical unit, in order.
    /// Implementations should make the batch atomic where the backend
    /// supports it; partial persistence must never reorder turns.
    async fn append(&self, user: &UserId, turns: &[Turn]) -> Result<(), StoreError>;

    /// Remove all turns for a user.
    async fn clear(&self, user: &UserId) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_display_and_equality() {
        let a = UserId::new("chat-42");
        let b: UserId = "chat-42".into();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "chat-42");
    }
}
