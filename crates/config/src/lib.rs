//! Configuration loading, validation, and management for CRMPilot.
//!
//! Loads configuration from a TOML file with environment variable overrides
//! for the secrets. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.crmpilot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Remote CRM credentials and endpoints
    #[serde(default)]
    pub crm: CrmConfig,

    /// Conversation store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Loop controller bounds
    #[serde(default)]
    pub agent: AgentConfig,

    /// Result cache bounds
    #[serde(default)]
    pub cache: CacheConfig,

    /// Report writer settings
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the LLM endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Chat-completions base URL
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_provider_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// OAuth client ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Long-lived refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// API domain for data operations
    #[serde(default = "default_api_domain")]
    pub api_domain: String,

    /// Accounts domain for the token endpoint
    #[serde(default = "default_accounts_domain")]
    pub accounts_domain: String,
}

fn default_api_domain() -> String {
    "https://www.zohoapis.com".into()
}
fn default_accounts_domain() -> String {
    "https://accounts.zoho.com".into()
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            api_domain: default_api_domain(),
            accounts_domain: default_accounts_domain(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    "crmpilot.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard ceiling on tool-dispatch rounds within one turn
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,

    /// Conversation window size (turns loaded per user)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Per-model-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tool_calls() -> u32 {
    25
}
fn default_max_turns() -> usize {
    50
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            max_turns: default_max_turns(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Result lists strictly longer than this are cached, not inlined
    #[serde(default = "default_large_result_threshold")]
    pub large_result_threshold: usize,

    /// Records per browse page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Seconds a cached result set stays valid
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_large_result_threshold() -> usize {
    50
}
fn default_page_size() -> usize {
    20
}
fn default_ttl_secs() -> u64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            large_result_threshold: default_large_result_threshold(),
            page_size: default_page_size(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory where exported report files are written
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    std::env::temp_dir().display().to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("crm", &self.crm)
            .field("store", &self.store)
            .field("agent", &self.agent)
            .field("cache", &self.cache)
            .field("report", &self.report)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl std::fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmConfig")
            .field("client_id", &redact(&self.client_id))
            .field("client_secret", &redact(&self.client_secret))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("api_domain", &self.api_domain)
            .field("accounts_domain", &self.accounts_domain)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.crmpilot/config.toml).
    ///
    /// Environment variables override file values for secrets:
    /// - `CRMPILOT_API_KEY` or `OPENROUTER_API_KEY` for the provider key
    /// - `CRM_CLIENT_ID`, `CRM_CLIENT_SECRET`, `CRM_REFRESH_TOKEN`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var("CRMPILOT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }
        if let Ok(model) = std::env::var("CRMPILOT_MODEL") {
            config.provider.model = model;
        }
        if config.crm.client_id.is_none() {
            config.crm.client_id = std::env::var("CRM_CLIENT_ID").ok();
        }
        if config.crm.client_secret.is_none() {
            config.crm.client_secret = std::env::var("CRM_CLIENT_SECRET").ok();
        }
        if config.crm.refresh_token.is_none() {
            config.crm.refresh_token = std::env::var("CRM_REFRESH_TOKEN").ok();
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".crmpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_tool_calls == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_calls must be at least 1".into(),
            ));
        }
        if self.cache.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "cache.page_size must be at least 1".into(),
            ));
        }
        if self.cache.large_result_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "cache.large_result_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Whether the secrets required for a live session are all present.
    pub fn has_credentials(&self) -> bool {
        self.provider.api_key.is_some()
            && self.crm.client_id.is_some()
            && self.crm.client_secret.is_some()
            && self.crm.refresh_token.is_some()
    }

    /// Generate a default config TOML string (for first-run scaffolding).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            crm: CrmConfig::default(),
            store: StoreConfig::default(),
            agent: AgentConfig::default(),
            cache: CacheConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_bounds() {
        let config = AppConfig::default();
        assert_eq!(config.agent.max_tool_calls, 25);
        assert_eq!(config.agent.max_turns, 50);
        assert_eq!(config.agent.timeout_secs, 120);
        assert_eq!(config.cache.large_result_threshold, 50);
        assert_eq!(config.cache.page_size, 20);
        assert_eq!(config.cache.ttl_secs, 600);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.model, config.provider.model);
        assert_eq!(parsed.cache.page_size, config.cache.page_size);
    }

    #[test]
    fn invalid_bounds_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 5.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.max_tool_calls = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cache.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.cache.ttl_secs, 600);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[provider]
api_key = "sk-test"
model = "openai/gpt-4o"

[cache]
page_size = 10
"#,
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider.model, "openai/gpt-4o");
        assert_eq!(config.cache.page_size, 10);
        // Untouched sections keep their defaults
        assert_eq!(config.cache.large_result_threshold, 50);
        assert_eq!(config.agent.max_tool_calls, 25);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-secret-key".into());
        config.crm.refresh_token = Some("1000.refresh".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-key"));
        assert!(!debug.contains("1000.refresh"));
        assert!(debug.contains("[REDACTED]"));
    }
}
