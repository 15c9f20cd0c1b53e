//! Application configuration management.
//!
//! This module handles loading the client configuration: the
//! backend URL, the transport timeout, the refresh skew and where the session
//! is kept.
//!
//! Configuration is stored at `~/.config/aiocensor/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::auth::manager::DEFAULT_REFRESH_SKEW_SECS;
use crate::auth::{FileSlot, KeyringSlot, SessionSlot};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "aiocensor";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "AIOCENSOR_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Transport timeout for login, refresh and protected calls.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub refresh_skew_secs: i64,
    pub storage: StorageBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_skew_secs: DEFAULT_REFRESH_SKEW_SECS,
            storage: StorageBackend::File,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::parse(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(std::env::var(BASE_URL_ENV).ok());
        debug!(base_url = %config.base_url, storage = ?config.storage, "Config loaded");
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config file")
    }

    fn apply_env(&mut self, base_url: Option<String>) {
        if let Some(base_url) = base_url.filter(|url| !url.trim().is_empty()) {
            self.base_url = base_url.trim().to_string();
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_skew_secs)
    }

    /// Open the session slot for the configured backend.
    pub fn session_slot(&self) -> Result<Box<dyn SessionSlot>> {
        Ok(match self.storage {
            StorageBackend::File => Box::new(FileSlot::new(self.cache_dir()?)),
            StorageBackend::Keyring => Box::new(KeyringSlot::new()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.refresh_skew(), chrono::Duration::seconds(60));
        assert_eq!(config.storage, StorageBackend::File);
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = Config::parse(r#"{"base_url": "https://censor.example", "storage": "keyring"}"#)
            .unwrap();
        assert_eq!(config.base_url, "https://censor.example");
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_parse_rejects_unknown_backend() {
        assert!(Config::parse(r#"{"storage": "registry"}"#).is_err());
    }

    #[test]
    fn test_env_overrides_base_url() {
        let mut config = Config::default();
        config.apply_env(Some(" https://override.example ".to_string()));
        assert_eq!(config.base_url, "https://override.example");

        config.apply_env(Some("   ".to_string()));
        assert_eq!(config.base_url, "https://override.example");

        config.apply_env(None);
        assert_eq!(config.base_url, "https://override.example");
    }
}
