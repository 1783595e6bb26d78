//! Application configuration management.
//!
//! Holds the API base URL and path conventions, the request timeout, where
//! credentials are kept, and the last username used to log in.
//!
//! Configuration is stored at `~/.config/kpitter/config.json`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth::{FileStorage, KeyringStorage, SecretStorage};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "kpitter";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Credential file name for the file backend
const CREDENTIALS_FILE: &str = "credentials.json";

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "KPITTER_BASE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// 30s allows for slow responses while failing fast enough for good UX.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// Owner-only JSON file next to the config
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API root, including any path prefix such as `/api`
    pub base_url: String,
    /// Append `/` to every endpoint path
    pub trailing_slash: bool,
    pub request_timeout_secs: u64,
    pub credential_backend: CredentialBackend,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            trailing_slash: false,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            credential_backend: CredentialBackend::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load from disk (defaults if missing), then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Write to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            self.apply_base_url_override(Some(url));
        }
    }

    fn apply_base_url_override(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Storage backend selected by `credential_backend`
    pub fn credential_storage(&self) -> Result<Box<dyn SecretStorage>> {
        Ok(match self.credential_backend {
            CredentialBackend::Keyring => Box::new(KeyringStorage::new(APP_NAME)),
            CredentialBackend::File => {
                Box::new(FileStorage::new(Self::config_dir()?.join(CREDENTIALS_FILE)))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert!(!config.trailing_slash);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"base_url": "https://kpitter.example/api/", "credential_backend": "file"}"#)
                .unwrap();
        assert_eq!(config.base_url, "https://kpitter.example/api/");
        assert_eq!(config.credential_backend, CredentialBackend::File);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.last_username, None);
    }

    #[test]
    fn test_base_url_override() {
        let mut config = Config::default();
        config.apply_base_url_override(Some("  ".to_string()));
        assert_eq!(config.base_url, "http://localhost:8000/api");
        config.apply_base_url_override(Some(" http://10.0.0.2:8000 ".to_string()));
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        config.apply_base_url_override(None);
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
    }

    #[test]
    fn test_save_to_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            last_username: Some("alice".to_string()),
            trailing_slash: true,
            ..Config::default()
        };

        config.save_to(&path).unwrap();

        let loaded: Config =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.last_username.as_deref(), Some("alice"));
        assert!(loaded.trailing_slash);
    }
}
