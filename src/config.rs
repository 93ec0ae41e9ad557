use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AppError;

/// Application configuration, loaded from `config.yaml`.
///
/// Every field has a default so the server can start without a config file.
/// The file path can be overridden with the `PODNOTES_CONFIG` environment
/// variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL of the podcast RSS feed.
    pub feed_url: String,
    /// Address the HTTP server binds to.
    pub bind: String,
    /// SQLite database path. `:memory:` keeps everything in-process.
    pub database_path: String,
    /// Minimum interval between two upstream feed fetches. A refresh
    /// inside this window is a no-op.
    pub cache_ttl_minutes: u64,
    /// Base URL used to synthesize an episode page link when the feed
    /// item carries none (`{base}/{number}`).
    pub episode_url_base: String,
    /// Fetch and ingest the feed once at startup. Failure is logged,
    /// not fatal.
    pub initial_refresh: bool,
    /// Query the debug endpoint probes episode fields with.
    pub debug_probe_query: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "https://ossan.fm/feed.xml".to_string(),
            bind: "0.0.0.0:5000".to_string(),
            database_path: "podnotes.db".to_string(),
            cache_ttl_minutes: 30,
            episode_url_base: "https://ossan.fm/ep".to_string(),
            initial_refresh: true,
            debug_probe_query: "こども".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `PODNOTES_CONFIG` (or `./config.yaml`),
    /// falling back to defaults when no file exists.
    pub fn load() -> Result<Self, AppError> {
        let path =
            std::env::var("PODNOTES_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {}", e)))?;
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_minutes * 60)
    }
}
