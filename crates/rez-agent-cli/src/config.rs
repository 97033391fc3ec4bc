// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading for the rez-agent CLI: where the daemon lives.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

fn default_daemon_url() -> String {
    "http://127.0.0.1:8089".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

/// CLI-side configuration: which daemon to talk to and how patiently.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_daemon_url")]
    pub daemon_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self { daemon_url: default_daemon_url(), timeout_seconds: default_timeout_seconds() }
    }
}

/// Errors found while loading or validating a [`CliConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    FileNotFound { path: String },
    ParseError { reason: String },
    InvalidDaemonUrl { url: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound { path } => write!(f, "config file not found: {path}"),
            ConfigError::ParseError { reason } => write!(f, "failed to parse config: {reason}"),
            ConfigError::InvalidDaemonUrl { url } => write!(f, "invalid daemon url: {url}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a [`CliConfig`] from an optional TOML file, then apply
/// `REZ_AGENT_CLI_DAEMON_URL` / `REZ_AGENT_CLI_TIMEOUT_SECONDS` env overrides.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .map_err(|_| ConfigError::FileNotFound { path: p.display().to_string() })?;
            toml::from_str(&content).map_err(|e| ConfigError::ParseError { reason: e.to_string() })?
        }
        None => CliConfig::default(),
    };

    if let Ok(url) = std::env::var("REZ_AGENT_CLI_DAEMON_URL") {
        config.daemon_url = url;
    }
    if let Ok(secs) = std::env::var("REZ_AGENT_CLI_TIMEOUT_SECONDS") {
        if let Ok(parsed) = secs.parse() {
            config.timeout_seconds = parsed;
        }
    }

    Ok(config)
}

/// Validate a loaded configuration.
pub fn validate_config(config: &CliConfig) -> Result<(), ConfigError> {
    if !config.daemon_url.starts_with("http://") && !config.daemon_url.starts_with("https://") {
        return Err(ConfigError::InvalidDaemonUrl { url: config.daemon_url.clone() });
    }
    Ok(())
}

impl CliConfig {
    /// This config's timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
