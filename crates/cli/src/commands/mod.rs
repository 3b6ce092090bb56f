//! Command implementations plus the shared stack builder.

pub mod chat;
pub mod clear_history;
pub mod doctor;
pub mod init;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use crmpilot_agent::{AgentRunner, LoopParams};
use crmpilot_config::AppConfig;
use crmpilot_core::crm::CrmClient;
use crmpilot_core::event::EventBus;
use crmpilot_crm::{CrmCredentials, HttpCrmClient};
use crmpilot_memory::SqliteStore;
use crmpilot_providers::OpenAiCompatProvider;
use crmpilot_tools::{CacheParams, CsvReportWriter, Pacer, ResultCache, builtin_registry};

pub(crate) fn crm_client(config: &AppConfig) -> anyhow::Result<Arc<HttpCrmClient>> {
    let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
        config.crm.client_id.clone(),
        config.crm.client_secret.clone(),
        config.crm.refresh_token.clone(),
    ) else {
        bail!(
            "CRM credentials missing. Set crm.client_id, crm.client_secret and \
             crm.refresh_token in {} (or the CRM_CLIENT_ID / CRM_CLIENT_SECRET / \
             CRM_REFRESH_TOKEN environment variables).",
            AppConfig::config_dir().join("config.toml").display()
        );
    };
    Ok(Arc::new(HttpCrmClient::new(CrmCredentials {
        client_id,
        client_secret,
        refresh_token,
        api_domain: config.crm.api_domain.clone(),
        accounts_domain: config.crm.accounts_domain.clone(),
    })?))
}

/// Build the full production stack from config: provider, CRM client,
/// SQLite store, result cache, tool registry, loop runner.
pub(crate) async fn build_runner(
    config: &AppConfig,
) -> anyhow::Result<(AgentRunner, Arc<SqliteStore>)> {
    let Some(api_key) = config.provider.api_key.clone() else {
        bail!(
            "No API key configured. Set OPENROUTER_API_KEY or add provider.api_key to {}.",
            AppConfig::config_dir().join("config.toml").display()
        );
    };

    let provider = OpenAiCompatProvider::new(
        "openrouter",
        &config.provider.base_url,
        api_key,
        &config.provider.model,
        config.provider.temperature,
        config.provider.max_tokens,
        config.agent.timeout_secs,
    )?;

    let crm: Arc<dyn CrmClient> = crm_client(config)?;

    let store = Arc::new(
        SqliteStore::new(&config.store.database_path)
            .await
            .context("failed to open conversation database")?,
    );

    let cache = Arc::new(ResultCache::new(
        CacheParams {
            large_result_threshold: config.cache.large_result_threshold,
            page_size: config.cache.page_size,
            ttl: Duration::from_secs(config.cache.ttl_secs),
        },
        Arc::new(CsvReportWriter::new(config.report.output_dir.clone())),
    ));

    let registry = builtin_registry(crm, cache, Pacer::default());

    let runner = AgentRunner::new(
        Arc::new(provider),
        store.clone(),
        Arc::new(registry),
        Arc::new(EventBus::default()),
        LoopParams {
            max_tool_calls: config.agent.max_tool_calls as usize,
            history_window: config.agent.max_turns,
        },
    );

    Ok((runner, store))
}
