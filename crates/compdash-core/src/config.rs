//! Application configuration management.
//!
//! The configuration names the API base URL, where tokens are persisted and
//! the per-request timeout. It is stored at `~/.config/compdash/config.json`
//! and two settings may be overridden from the environment:
//!
//! - `COMPDASH_API_BASE_URL`: API base URL
//! - `COMPDASH_TOKEN_STORE`: `keyring`, `file` or `memory`

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStore, KeyringStore, MemoryStore, TokenStore};

/// Application name used for config/data directory paths and the keychain
const APP_NAME: &str = "compdash";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Token file name inside the data directory
const TOKEN_FILE: &str = "tokens.json";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const BASE_URL_ENV: &str = "COMPDASH_API_BASE_URL";
const TOKEN_STORE_ENV: &str = "COMPDASH_TOKEN_STORE";

/// Where the access and refresh tokens are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS keychain
    Keyring,
    /// Owner-only JSON file in the data directory
    #[default]
    File,
    /// Process memory; nothing survives a restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(Self::Keyring),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown token store '{}' (expected keyring, file or memory)",
                other
            )),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Keyring => "keyring",
            Self::File => "file",
            Self::Memory => "memory",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub storage: StorageBackend,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage: StorageBackend::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            Self::parse(&contents)
        } else {
            Ok(Self::default())
        }
    }

    fn parse(contents: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(contents).context("Failed to parse config file")?;
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Apply `COMPDASH_*` environment overrides
    pub fn apply_env(self) -> Result<Self> {
        self.with_overrides(
            std::env::var(BASE_URL_ENV).ok(),
            std::env::var(TOKEN_STORE_ENV).ok(),
        )
    }

    /// Apply overrides for the base URL and token store; empty values are ignored
    pub fn with_overrides(
        mut self,
        api_base_url: Option<String>,
        token_store: Option<String>,
    ) -> Result<Self> {
        if let Some(url) = api_base_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(store) = token_store.filter(|s| !s.trim().is_empty()) {
            self.storage = store.parse()?;
        }
        Ok(self)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn token_file_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(TOKEN_FILE))
    }

    /// Open the configured token store
    pub fn open_store(&self) -> Result<Arc<dyn TokenStore>> {
        let store: Arc<dyn TokenStore> = match self.storage {
            StorageBackend::Keyring => Arc::new(KeyringStore::new(APP_NAME)),
            StorageBackend::File => Arc::new(FileStore::new(Self::token_file_path()?)),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:5000/api");
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_parse_partial_config_fills_defaults() {
        let config = Config::parse(r#"{"api_base_url": "https://dash.example.com/api/"}"#)
            .expect("parse config");
        assert_eq!(config.api_base_url, "https://dash.example.com/api");
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.request_timeout_secs, 30);

        let config = Config::parse(r#"{"storage": "keyring", "request_timeout_secs": 5}"#)
            .expect("parse config");
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_parse_rejects_unknown_backend() {
        assert!(Config::parse(r#"{"storage": "cookie"}"#).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .with_overrides(
                Some("http://127.0.0.1:8080/api/".to_string()),
                Some("Memory".to_string()),
            )
            .expect("apply overrides");
        assert_eq!(config.api_base_url, "http://127.0.0.1:8080/api");
        assert_eq!(config.storage, StorageBackend::Memory);

        // Empty values leave the file settings alone
        let config = Config::default()
            .with_overrides(Some("  ".to_string()), Some(String::new()))
            .expect("apply overrides");
        assert_eq!(config, Config::default());

        assert!(Config::default()
            .with_overrides(None, Some("cookie".to_string()))
            .is_err());
    }

    #[test]
    fn test_storage_backend_display_roundtrip() {
        for backend in [
            StorageBackend::Keyring,
            StorageBackend::File,
            StorageBackend::Memory,
        ] {
            assert_eq!(backend.to_string().parse::<StorageBackend>().unwrap(), backend);
        }
    }
}
