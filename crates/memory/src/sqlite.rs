//! SQLite conversation store.
//!
//! One `conversations` table holds every turn, keyed by user identity and
//! ordered by an autoincrement rowid (insertion order is the source of truth
//! for ordering; `created_at` is informational). Batch appends run inside a
//! transaction so a turn's worth of history lands atomically.

use async_trait::async_trait;
use chrono::Utc;
use crmpilot_core::error::StoreError;
use crmpilot_core::store::{ConversationStore, UserId};
use crmpilot_core::turn::{Role, ToolInvocation, Turn};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable SQLite-backed conversation store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store from a file path.
    ///
    /// The database and schema are created automatically.
    /// Pass `":memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite conversation store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id      TEXT NOT NULL,
                role         TEXT NOT NULL,
                content      TEXT,
                tool_calls   TEXT,
                tool_call_id TEXT,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("conversations table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("user index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<Turn, StoreError> {
        let role_str: String = row
            .try_get("role")
            .map_err(|e| StoreError::QueryFailed(format!("role column: {e}")))?;
        let role: Role = role_str
            .parse()
            .map_err(|e: String| StoreError::QueryFailed(e))?;
        let content: Option<String> = row
            .try_get("content")
            .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
        let tool_calls_json: Option<String> = row
            .try_get("tool_calls")
            .map_err(|e| StoreError::QueryFailed(format!("tool_calls column: {e}")))?;
        let tool_call_id: Option<String> = row
            .try_get("tool_call_id")
            .map_err(|e| StoreError::QueryFailed(format!("tool_call_id column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;

        let tool_calls: Vec<ToolInvocation> = match tool_calls_json {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| StoreError::QueryFailed(format!("tool_calls parse: {e}")))?,
            None => Vec::new(),
        };

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Turn {
            role,
            content,
            tool_calls,
            tool_call_id,
            created_at,
        })
    }

    /// Delete turns older than the given number of days, across all users.
    /// Returns the number of rows removed.
    pub async fn cleanup_older_than(&self, days: i64) -> Result<u64, StoreError> {
        let cutoff = (Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        let result = sqlx::query("DELETE FROM conversations WHERE created_at < ?")
            .bind(&cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("cleanup: {e}")))?;
        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, days, "Pruned old conversation turns");
        }
        Ok(removed)
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn load(&self, user: &UserId, limit: usize) -> Result<Vec<Turn>, StoreError> {
        // Take the newest `limit` rows, then flip back to chronological order
        let rows = sqlx::query(
            r#"
            SELECT role, content, tool_calls, tool_call_id, created_at
            FROM conversations
            WHERE user_id = ?
            ORDER BY iid DESC
            LIMIT ?
            "#,
        )
        .bind(user.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("load: {e}")))?;

        let mut turns = rows
            .iter()
            .map(Self::row_to_turn)
            .collect::<Result<Vec<_>, _>>()?;
        turns.reverse();
        Ok(turns)
    }

    async fn append(&self, user: &UserId, turns: &[Turn]) -> Result<(), StoreError> {
        if turns.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin transaction: {e}")))?;

        for turn in turns {
            let tool_calls_json = if turn.tool_calls.is_empty() {
                None
            } else {
                Some(
                    serde_json::to_string(&turn.tool_calls)
                        .map_err(|e| StoreError::Storage(format!("tool_calls encode: {e}")))?,
                )
            };

            sqlx::query(
                r#"
                INSERT INTO conversations (user_id, role, content, tool_calls, tool_call_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(user.as_str())
            .bind(turn.role.as_str())
            .bind(&turn.content)
            .bind(tool_calls_json)
            .bind(&turn.tool_call_id)
            .bind(turn.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("append: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("commit: {e}")))?;
        Ok(())
    }

    async fn clear(&self, user: &UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM conversations WHERE user_id = ?")
            .bind(user.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("clear: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteStore {
        SqliteStore::new(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn append_and_load_preserves_order() {
        let store = test_store().await;
        let user = UserId::new("u1");

        let turns = vec![
            Turn::user("Find John Smith"),
            Turn::assistant_tool_calls(
                None,
                vec![ToolInvocation {
                    id: "call_1".into(),
                    name: "search_by_word".into(),
                    arguments: serde_json::json!({"module": "Leads", "word": "John Smith"}),
                }],
            ),
            Turn::tool_result("call_1", "Found lead: John Smith (ID: 123)"),
            Turn::assistant("I found John Smith."),
        ];
        store.append(&user, &turns).await.unwrap();

        let loaded = store.load(&user, 50).await.unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded[0].role, Role::User);
        assert_eq!(loaded[1].tool_calls[0].id, "call_1");
        assert_eq!(loaded[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(loaded[3].content.as_deref(), Some("I found John Smith."));
    }

    #[tokio::test]
    async fn load_returns_most_recent_window_chronologically() {
        let store = test_store().await;
        let user = UserId::new("u1");

        for i in 0..10 {
            store
                .append(&user, &[Turn::user(format!("message {i}"))])
                .await
                .unwrap();
        }

        let loaded = store.load(&user, 3).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].content.as_deref(), Some("message 7"));
        assert_eq!(loaded[2].content.as_deref(), Some("message 9"));
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = test_store().await;
        store
            .append(&UserId::new("a"), &[Turn::user("from a")])
            .await
            .unwrap();
        store
            .append(&UserId::new("b"), &[Turn::user("from b")])
            .await
            .unwrap();

        let a = store.load(&UserId::new("a"), 50).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content.as_deref(), Some("from a"));
    }

    #[tokio::test]
    async fn clear_removes_only_that_user() {
        let store = test_store().await;
        let a = UserId::new("a");
        let b = UserId::new("b");
        store.append(&a, &[Turn::user("hi")]).await.unwrap();
        store.append(&b, &[Turn::user("hi")]).await.unwrap();

        store.clear(&a).await.unwrap();
        assert!(store.load(&a, 50).await.unwrap().is_empty());
        assert_eq!(store.load(&b, 50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cleanup_prunes_old_turns() {
        let store = test_store().await;
        let user = UserId::new("u1");

        let mut old = Turn::user("ancient history");
        old.created_at = Utc::now() - chrono::Duration::days(60);
        store.append(&user, &[old, Turn::user("recent")]).await.unwrap();

        let removed = store.cleanup_older_than(30).await.unwrap();
        assert_eq!(removed, 1);

        let loaded = store.load(&user, 50).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content.as_deref(), Some("recent"));
    }

    #[tokio::test]
    async fn empty_append_is_a_noop() {
        let store = test_store().await;
        let user = UserId::new("u1");
        store.append(&user, &[]).await.unwrap();
        assert!(store.load(&user, 50).await.unwrap().is_empty());
    }
}
