//! Conversation store backends for CRMPilot.
//!
//! Two implementations of `crmpilot_core::ConversationStore`:
//! - `SqliteStore` — durable per-user history, the production backend;
//! - `InMemoryStore` — ephemeral sessions and tests.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
