//! `crmpilot clear-history` — forget a user's conversation.

use crmpilot_config::AppConfig;
use crmpilot_core::store::{ConversationStore, UserId};
use crmpilot_memory::SqliteStore;

pub async fn run(user: &str) -> anyhow::Result<()> {
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;
    let store = SqliteStore::new(&config.store.database_path).await?;

    store.clear(&UserId::new(user)).await?;
    println!("Conversation history cleared for '{user}'.");
    Ok(())
}
