//! In-memory conversation store for tests and ephemeral sessions.

use async_trait::async_trait;
use crmpilot_core::error::StoreError;
use crmpilot_core::store::{ConversationStore, UserId};
use crmpilot_core::turn::Turn;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A non-durable store: everything is gone when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    conversations: RwLock<HashMap<UserId, Vec<Turn>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn load(&self, user: &UserId, limit: usize) -> Result<Vec<Turn>, StoreError> {
        let guard = self.conversations.read().await;
        let turns = guard.get(user).map(Vec::as_slice).unwrap_or_default();
        let start = turns.len().saturating_sub(limit);
        Ok(turns[start..].to_vec())
    }

    async fn append(&self, user: &UserId, turns: &[Turn]) -> Result<(), StoreError> {
        let mut guard = self.conversations.write().await;
        guard
            .entry(user.clone())
            .or_default()
            .extend_from_slice(turns);
        Ok(())
    }

    async fn clear(&self, user: &UserId) -> Result<(), StoreError> {
        self.conversations.write().await.remove(user);
        Ok(())
    }
}
