//! Client configuration for the remote SLO service

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::trace;

const API_URL: &str = "SLO_API_URL";
const ACCESS_ID: &str = "SLO_ACCESS_ID";
const ACCESS_KEY: &str = "SLO_ACCESS_KEY";
const TIMEOUT_SECS: &str = "SLO_TIMEOUT_SECS";

/// Connection settings for the remote SLO service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL the SLO endpoints are appended to
    #[serde(default = "default_api_url")]
    pub api_url: String,

    pub access_id: Option<String>,

    pub access_key: Option<String>,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            access_id: None,
            access_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ClientConfig {
    /// `~/.config/slo-reconciler/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/slo-reconciler/config.toml"))
    }

    /// Load configuration from file, or use defaults if no file exists.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| Self::default_path().filter(|p| p.exists()));

        let Some(path) = config_path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
            .inspect(|config| trace!("loaded client config: {config:?}"))
    }

    /// Apply `SLO_*` environment variables on top of this configuration.
    pub fn with_env_overrides(self) -> Self {
        self.overridden_by(|key| std::env::var(key).ok())
    }

    fn overridden_by(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL) {
            self.api_url = url;
        }
        if let Some(id) = lookup(ACCESS_ID) {
            self.access_id = Some(id);
        }
        if let Some(key) = lookup(ACCESS_KEY) {
            self.access_key = Some(key);
        }
        if let Some(timeout) = lookup(TIMEOUT_SECS).and_then(|t| t.parse().ok()) {
            self.timeout_secs = timeout;
        }
        self
    }

    /// Both halves of the credential pair, when configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_id, &self.access_key) {
            (Some(id), Some(key)) => Some((id.as_str(), key.as_str())),
            _ => None,
        }
    }
}
