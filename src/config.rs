//! YAML configuration for embedhub.
//!
//! Everything is optional; a missing file means defaults. Selected fields can
//! be overridden from the environment (`EMBEDHUB_*`), which wins over the file.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! client_uri: "ollama://localhost:11434?model=embeddinggemma"
//! precision: 32
//! timeout_secs: 30
//! connect_timeout_secs: 10
//! python: "python3"
//! log_level: "info"
//! json_logs: false
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use embeddings::{BackendContext, Precision};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const ENV_CLIENT_URI: &str = "EMBEDHUB_CLIENT_URI";
pub const ENV_PRECISION: &str = "EMBEDHUB_PRECISION";
pub const ENV_TIMEOUT_SECS: &str = "EMBEDHUB_TIMEOUT_SECS";
pub const ENV_LOG_LEVEL: &str = "EMBEDHUB_LOG_LEVEL";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbedHubConfig {
    #[serde(default = "default_version")]
    pub version: String,

    /// Backend selection URI, e.g. `null://` or `ollama://?model=...`.
    #[serde(default = "default_client_uri")]
    pub client_uri: String,

    /// Storage precision of returned vectors: 32 or 64.
    #[serde(default = "default_precision")]
    pub precision: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Interpreter for script-driven backends.
    #[serde(default = "default_python")]
    pub python: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub json_logs: bool,
}

impl EmbedHubConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EmbedHubConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// File (or defaults) plus process environment overrides, validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `EMBEDHUB_*` overrides looked up through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(ENV_CLIENT_URI) {
            self.client_uri = uri;
        }
        if let Some(raw) = lookup(ENV_PRECISION) {
            self.precision = parse_env(ENV_PRECISION, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = parse_env(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if Precision::from_bits(self.precision).is_none() {
            return Err(ConfigLoadError::Validation(format!(
                "precision must be 32 or 64, got {}",
                self.precision
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "timeout_secs must be >= 1".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "connect_timeout_secs must be >= 1".to_string(),
            ));
        }
        if self.python.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "python must not be empty".to_string(),
            ));
        }
        Url::parse(&self.client_uri).map_err(|e| {
            ConfigLoadError::Validation(format!("client_uri '{}': {e}", self.client_uri))
        })?;
        Ok(())
    }

    /// Validated storage precision; falls back to float32.
    pub fn storage_precision(&self) -> Precision {
        Precision::from_bits(self.precision).unwrap_or(Precision::Float32)
    }

    pub fn backend_context(&self) -> BackendContext {
        BackendContext {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            python: self.python.clone(),
        }
    }
}

impl Default for EmbedHubConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            client_uri: default_client_uri(),
            precision: default_precision(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            python: default_python(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn parse_env<V>(var: &str, raw: &str) -> Result<V, ConfigLoadError>
where
    V: std::str::FromStr,
    V::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: V::Err| ConfigLoadError::InvalidEnv {
        var: var.to_string(),
        reason: format!("'{raw}': {e}"),
    })
}

fn default_version() -> String {
    "1.0".to_string()
}
fn default_client_uri() -> String {
    "null://".to_string()
}
fn default_precision() -> u32 {
    32
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_python() -> String {
    "python3".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
