//! Application configuration.
//!
//! Sources, later ones winning: `config/default.toml` (optional), then
//! `RUSTY_LEDGER__<SECTION>__<KEY>` environment variables.

use serde::Deserialize;
use std::path::PathBuf;

use crate::Result;

const ENV_PREFIX: &str = "RUSTY_LEDGER";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per storage key.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".rusty-ledger")
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightsConfig {
    /// Falls back to the `API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// How many of the latest transactions go into the prompt.
    #[serde(default = "default_recent_transactions")]
    pub recent_transactions: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            recent_transactions: default_recent_transactions(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_recent_transactions() -> usize {
    20
}

fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Loads configuration from the optional config file and the environment.
    pub fn load() -> Result<Self> {
        let mut config: AppConfig = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        if config.insights.api_key.is_none() {
            config.insights.api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(
            [
                "RUSTY_LEDGER__STORAGE__DATA_DIR",
                "RUSTY_LEDGER__INSIGHTS__MODEL",
                "API_KEY",
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.storage.data_dir, PathBuf::from(".rusty-ledger"));
                assert_eq!(config.insights.model, "gemini-3-flash-preview");
                assert_eq!(config.insights.recent_transactions, 20);
                assert_eq!(config.insights.api_key, None);
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("RUSTY_LEDGER__STORAGE__DATA_DIR", Some("/tmp/ledger")),
                ("RUSTY_LEDGER__INSIGHTS__MODEL", Some("gemini-test")),
                ("API_KEY", Some("key-from-env")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/ledger"));
                assert_eq!(config.insights.model, "gemini-test");
                assert_eq!(config.insights.api_key.as_deref(), Some("key-from-env"));
            },
        );
    }
}
