//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the backend base URL, request timeout, cache behaviour, where the admin
//! token is kept, and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/coachsite/config.json`. Any field
//! can be overridden from the environment (`COACHSITE_*`).

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::transport::normalize_base_url;
use crate::api::DEFAULT_TIMEOUT_SECS;
use crate::auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
use crate::cache::{CacheKeying, CacheOptions, InFlight, DEFAULT_FRESHNESS_SECS};

/// Application name used for config/data directory paths
const APP_NAME: &str = "coachsite";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "COACHSITE_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "COACHSITE_TIMEOUT_SECS";
pub const ENV_CACHE_TTL_SECS: &str = "COACHSITE_CACHE_TTL_SECS";
pub const ENV_TOKEN_STORE: &str = "COACHSITE_TOKEN_STORE";

/// Where the admin bearer token is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStoreKind {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for TokenStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(TokenStoreKind::File),
            "keyring" | "keychain" => Ok(TokenStoreKind::Keyring),
            "memory" => Ok(TokenStoreKind::Memory),
            other => Err(format!("Unknown token store: {}", other)),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_FRESHNESS_SECS as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub api_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub cache_keying: CacheKeying,
    #[serde(default)]
    pub in_flight: InFlight,
    #[serde(default)]
    pub token_store: TokenStoreKind,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_keying: CacheKeying::default(),
            in_flight: InFlight::default(),
            token_store: TokenStoreKind::default(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Self = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("Invalid settings in {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`. Empty values are ignored; unparsable
    /// ones are an error.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            debug!(api_url = %url, "API URL from environment");
            self.api_url = Some(url);
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))?;
        }
        if let Some(secs) = get(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_CACHE_TTL_SECS))?;
            self.freshness_window()
                .with_context(|| format!("{} is too large", ENV_CACHE_TTL_SECS))?;
        }
        if let Some(kind) = get(ENV_TOKEN_STORE) {
            self.token_store = kind.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    /// Reject values that cannot be turned into the durations they describe.
    pub fn validate(&self) -> Result<()> {
        self.freshness_window().context("cache_ttl_secs is too large")?;
        Ok(())
    }

    fn freshness_window(&self) -> Result<chrono::Duration> {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .with_context(|| format!("{} seconds is out of range", self.cache_ttl_secs))
    }

    /// Base URL trimmed and without trailing slashes.
    pub fn normalized_api_url(&self) -> Result<String> {
        let url = self
            .api_url
            .as_deref()
            .map(normalize_base_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No API URL configured. Set {} or run `coachsite config set-url <url>`",
                    ENV_API_URL
                )
            })?;
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            // Out-of-range windows are rejected by validate(); clamp here
            // for configs built in code.
            freshness: self.freshness_window().unwrap_or(chrono::Duration::MAX),
            keying: self.cache_keying,
            in_flight: self.in_flight,
        }
    }

    pub fn open_token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_store {
            TokenStoreKind::File => Arc::new(FileTokenStore::new(self.data_dir()?)),
            TokenStoreKind::Keyring => Arc::new(KeyringTokenStore::new()),
            TokenStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.cache_options(), CacheOptions::default());
        assert_eq!(config.token_store, TokenStoreKind::File);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_url": "https://api.example.edu/api", "in_flight": "independent"}"#)
                .unwrap();
        assert_eq!(config.in_flight, InFlight::Independent);
        assert_eq!(config.cache_keying, CacheKeying::PerCategory);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                (ENV_API_URL, " https://api.example.edu/api// "),
                (ENV_TIMEOUT_SECS, "30"),
                (ENV_CACHE_TTL_SECS, ""),
                (ENV_TOKEN_STORE, "memory"),
            ]))
            .unwrap();

        assert_eq!(
            config.normalized_api_url().unwrap(),
            "https://api.example.edu/api"
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.token_store, TokenStoreKind::Memory);
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(env(&[(ENV_TIMEOUT_SECS, "soon")]))
            .is_err());
        assert!(config
            .apply_overrides(env(&[(ENV_TOKEN_STORE, "cookie")]))
            .is_err());
    }

    #[test]
    fn test_huge_cache_ttl_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[(ENV_CACHE_TTL_SECS, "10000000000000000")]))
            .unwrap_err();
        assert!(format!("{:#}", err).contains(ENV_CACHE_TTL_SECS));

        let mut config = Config::default();
        config.cache_ttl_secs = u64::MAX;
        assert!(config.validate().is_err());
        assert_eq!(config.cache_options().freshness, chrono::Duration::MAX);
    }

    #[test]
    fn test_missing_api_url_is_an_error() {
        let mut config = Config::default();
        assert!(config.normalized_api_url().is_err());
        config.api_url = Some("  /  ".into());
        assert!(config.normalized_api_url().is_err());
    }
}
