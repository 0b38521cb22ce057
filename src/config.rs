//! Application configuration loaded from `config.yaml`.
//!
//! Every field has a default, so a missing file yields a working setup that
//! reads rules from `./configs` and stores collected URLs in `./data`.

use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `rules/`, `templates/` and `counters/`.
    pub configs_dir: PathBuf,
    /// sqlx connection string for the collected-URL store.
    pub database_url: String,
    pub user_agent: String,
    /// Extra attempts for a failed page fetch.
    pub fetch_retries: usize,
    /// Upper bound for polling a single feed.
    pub feed_timeout_secs: u64,
    pub github: GitHubConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            configs_dir: PathBuf::from("configs"),
            database_url: "sqlite://data/collector.db?mode=rwc".to_string(),
            user_agent: concat!("lctt_collector/", env!("CARGO_PKG_VERSION")).to_string(),
            fetch_retries: 3,
            feed_timeout_secs: 20,
            github: GitHubConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base: String,
    /// Account owning the fork that branches are pushed to.
    pub owner: String,
    /// Account owning the upstream repository pull requests target.
    pub base_owner: String,
    pub repository: String,
    pub base_branch: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: "GITHUB_ID".to_string(),
            base_owner: "LCTT".to_string(),
            repository: "TranslateProject".to_string(),
            base_branch: "master".to_string(),
        }
    }
}

/// Load the configuration file, falling back to defaults when it does not exist.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_config(path: &Path) -> Result<AppConfig> {
    if !tokio::fs::try_exists(path).await? {
        info!("No configuration file; using defaults");
        return Ok(AppConfig::default());
    }
    let yaml = tokio::fs::read_to_string(path).await?;
    let config: AppConfig = serde_yaml::from_str(&yaml)?;
    info!(configs_dir = %config.configs_dir.display(), "Loaded configuration");
    Ok(config)
}
