use crate::error::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Settings for talking to a running service (`mathapi call`).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

pub const BIND_ENV: &str = "MATHAPI_BIND";
pub const URL_ENV: &str = "MATHAPI_URL";

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Defaults
fn default_bind() -> String {
    "127.0.0.1:8080".into()
}
fn default_base_url() -> String {
    "http://127.0.0.1:8080".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_filter() -> String {
    "mathapi=info".into()
}

impl Config {
    /// Read `path` and apply `MATHAPI_BIND` / `MATHAPI_URL` on top of it.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, env_lookup)
    }

    /// Load `path` if it exists, otherwise fall back to defaults. Environment
    /// overrides apply either way.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        let mut config = Self::default();
        config.apply_overrides(env_lookup);
        Ok(config)
    }

    fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse config: {e}")))?;
        config.apply_overrides(lookup);
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup(BIND_ENV) {
            tracing::debug!(%bind, "{BIND_ENV} overrides server.bind");
            self.server.bind = bind;
        }
        if let Some(url) = lookup(URL_ENV) {
            tracing::debug!(%url, "{URL_ENV} overrides client.base_url");
            self.client.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        let url = &self.client.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::config(format!(
                "client.base_url must start with http:// or https://, got '{url}'"
            )));
        }
        if self.client.timeout_secs == 0 {
            return Err(Error::config("client.timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| Error::config(format!("Invalid server.bind '{}': {e}", self.server.bind)))
    }
}
