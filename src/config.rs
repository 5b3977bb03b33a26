use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_base_endpoint() -> String {
    "http://localhost:8080".to_string()
}

/// Client configuration, loadable from a JSON file with environment
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend root URL, e.g. `https://shop.example.com`.
    #[serde(default = "default_base_endpoint")]
    pub base_endpoint: String,
    /// Whether cookies are exchanged with the backend.
    #[serde(default = "default_true")]
    pub with_credential_storage: bool,
    /// Whether an authorization failure triggers the renewal-and-retry
    /// protocol. On by default.
    #[serde(default = "default_true")]
    pub retry_on_auth_failure: bool,
    /// Timeout applied independently to every underlying request
    /// (original, renewal exchange, retry).
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Where session credentials are persisted. `None` keeps them in
    /// memory only.
    #[serde(default)]
    pub credentials_file: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_endpoint: default_base_endpoint(),
            with_credential_storage: true,
            retry_on_auth_failure: true,
            request_timeout_secs: default_timeout_secs(),
            credentials_file: None,
        }
    }
}

impl ClientConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).context("reading config file")?;
        let mut config: ClientConfig = serde_json::from_str(&raw).context("parsing JSON")?;
        config.apply_env();
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults. Either
    /// way environment overrides win.
    pub fn load(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            let mut config = Self::default();
            config.apply_env();
            Ok(config)
        }
    }

    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("STOREFRONT_BASE_ENDPOINT") {
            if !endpoint.is_empty() {
                self.base_endpoint = endpoint;
            }
        }
        if let Ok(secs) = std::env::var("STOREFRONT_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                self.request_timeout_secs = secs;
            }
        }
        if let Ok(path) = std::env::var("STOREFRONT_CREDENTIALS_FILE") {
            if !path.is_empty() {
                self.credentials_file = Some(path);
            }
        }
    }
}
