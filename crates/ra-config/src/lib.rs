// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Configuration loading, validation, and merging for the rez-agent pipeline.
//!
//! Recognized options follow spec §6: deployment `stage`, store/topic/queue
//! names, timeouts, retry counts, and cache TTLs. Values are loaded from an
//! optional TOML file and then overridden by `REZ_AGENT_*` environment
//! variables, matching the precedence the daemon and CLI both rely on.

use std::path::Path;

use ra_error::RezError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors / warnings
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },
    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

impl From<ConfigError> for RezError {
    fn from(e: ConfigError) -> Self {
        RezError::validation(e.to_string())
    }
}

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// A timeout or retry count is unusually large.
    UnusualValue {
        /// Field name.
        field: String,
        /// Rendered value.
        value: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::UnusualValue { field, value } => {
                write!(f, "unusual value for '{field}': {value}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Top-level runtime configuration for the rez-agent pipeline (spec §6).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Deployment stage: `dev` | `stage` | `prod`.
    #[serde(default = "default_stage")]
    pub stage: String,
    /// Opaque push-notification endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifier_url: Option<String>,
    /// Directives table/store name.
    #[serde(default = "default_directives_table")]
    pub directives_table: String,
    /// Results table/store name.
    #[serde(default = "default_results_table")]
    pub results_table: String,
    /// Pub/sub topic for web-action directives.
    #[serde(default = "default_web_actions_topic")]
    pub web_actions_topic: String,
    /// Pub/sub topic for notify directives.
    #[serde(default = "default_notifications_topic")]
    pub notifications_topic: String,
    /// Pub/sub topic for scheduled directives.
    #[serde(default = "default_schedules_topic")]
    pub schedules_topic: String,
    /// Pub/sub topic for agent-response directives.
    #[serde(default = "default_agent_response_topic")]
    pub agent_response_topic: String,
    /// Consumer queue bound to `web_actions_topic`.
    #[serde(default = "default_web_actions_queue")]
    pub web_actions_queue: String,
    /// `DEBUG|INFO|WARN|ERROR`, default `INFO`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Template for per-course/stage secret lookup. `{course}` and
    /// `{stage}` are substituted by the caller.
    #[serde(default = "default_golf_secret_name_template")]
    pub golf_secret_name_template: String,
    /// Per-attempt HTTP timeout in seconds.
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    /// Maximum HTTP attempts (including the first).
    #[serde(default = "default_http_max_retries")]
    pub http_max_retries: u32,
    /// OAuth token cache TTL ceiling, in minutes (informational; the actual
    /// expiry is driven by `expires_in` from the token response).
    #[serde(default = "default_oauth_cache_ttl_minutes")]
    pub oauth_cache_ttl_minutes: u64,
    /// Secrets cache TTL in minutes.
    #[serde(default = "default_secrets_cache_ttl_minutes")]
    pub secrets_cache_ttl_minutes: u64,
}

fn default_stage() -> String {
    "dev".into()
}
fn default_directives_table() -> String {
    "rez-agent-directives".into()
}
fn default_results_table() -> String {
    "rez-agent-results".into()
}
fn default_web_actions_topic() -> String {
    "web-actions".into()
}
fn default_notifications_topic() -> String {
    "notifications".into()
}
fn default_schedules_topic() -> String {
    "schedules".into()
}
fn default_agent_response_topic() -> String {
    "agent-responses".into()
}
fn default_web_actions_queue() -> String {
    "web-actions-queue".into()
}
fn default_log_level() -> String {
    "INFO".into()
}
fn default_golf_secret_name_template() -> String {
    "rez-agent/golf/{course}/credentials-{stage}".into()
}
fn default_http_timeout_seconds() -> u64 {
    30
}
fn default_http_max_retries() -> u32 {
    3
}
fn default_oauth_cache_ttl_minutes() -> u64 {
    50
}
fn default_secrets_cache_ttl_minutes() -> u64 {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage: default_stage(),
            notifier_url: None,
            directives_table: default_directives_table(),
            results_table: default_results_table(),
            web_actions_topic: default_web_actions_topic(),
            notifications_topic: default_notifications_topic(),
            schedules_topic: default_schedules_topic(),
            agent_response_topic: default_agent_response_topic(),
            web_actions_queue: default_web_actions_queue(),
            log_level: default_log_level(),
            golf_secret_name_template: default_golf_secret_name_template(),
            http_timeout_seconds: default_http_timeout_seconds(),
            http_max_retries: default_http_max_retries(),
            oauth_cache_ttl_minutes: default_oauth_cache_ttl_minutes(),
            secrets_cache_ttl_minutes: default_secrets_cache_ttl_minutes(),
        }
    }
}

const VALID_STAGES: &[&str] = &["dev", "stage", "prod"];
const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARN", "ERROR"];
const MAX_HTTP_TIMEOUT_SECONDS: u64 = 300;
const LARGE_RETRY_THRESHOLD: u32 = 10;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`PipelineConfig`] from an optional TOML file path, then apply
/// `REZ_AGENT_*` environment overrides.
///
/// # Errors
/// Returns [`ConfigError::FileNotFound`] or [`ConfigError::ParseError`].
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .map_err(|_| ConfigError::FileNotFound { path: p.display().to_string() })?;
            parse_toml(&content)?
        }
        None => PipelineConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`PipelineConfig`].
///
/// # Errors
/// Returns [`ConfigError::ParseError`] on malformed TOML or type mismatch.
pub fn parse_toml(content: &str) -> Result<PipelineConfig, ConfigError> {
    toml::from_str::<PipelineConfig>(content).map_err(|e| ConfigError::ParseError { reason: e.to_string() })
}

/// Apply `REZ_AGENT_*` environment variable overrides in place.
pub fn apply_env_overrides(config: &mut PipelineConfig) {
    if let Ok(v) = std::env::var("REZ_AGENT_STAGE") {
        config.stage = v;
    }
    if let Ok(v) = std::env::var("REZ_AGENT_NOTIFIER_URL") {
        config.notifier_url = Some(v);
    }
    if let Ok(v) = std::env::var("REZ_AGENT_LOG_LEVEL") {
        config.log_level = v;
    }
    if let Ok(v) = std::env::var("REZ_AGENT_HTTP_TIMEOUT_SECONDS") {
        if let Ok(n) = v.parse() {
            config.http_timeout_seconds = n;
        }
    }
    if let Ok(v) = std::env::var("REZ_AGENT_HTTP_MAX_RETRIES") {
        if let Ok(n) = v.parse() {
            config.http_max_retries = n;
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a loaded configuration, returning advisory warnings.
///
/// # Errors
/// Returns [`ConfigError::ValidationError`] on hard errors: unknown `stage`,
/// unknown `log_level`, zero/absurd timeout, or zero retries.
pub fn validate_config(config: &PipelineConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !VALID_STAGES.contains(&config.stage.as_str()) {
        errors.push(format!("invalid stage '{}'", config.stage));
    }
    if !VALID_LOG_LEVELS.contains(&config.log_level.as_str()) {
        errors.push(format!("invalid log_level '{}'", config.log_level));
    }
    if config.http_timeout_seconds == 0 || config.http_timeout_seconds > MAX_HTTP_TIMEOUT_SECONDS {
        errors.push(format!(
            "http_timeout_seconds {} out of range (1..{MAX_HTTP_TIMEOUT_SECONDS})",
            config.http_timeout_seconds
        ));
    }
    if config.http_max_retries == 0 {
        errors.push("http_max_retries must be at least 1".into());
    } else if config.http_max_retries > LARGE_RETRY_THRESHOLD {
        warnings.push(ConfigWarning::UnusualValue {
            field: "http_max_retries".into(),
            value: config.http_max_retries.to_string(),
        });
    }
    if config.notifier_url.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "notifier_url".into(),
            hint: "downstream notify directives will have nowhere to deliver".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations; non-default values in `overlay` take
/// precedence over `base`. Used to layer a per-stage override file on top
/// of a base file.
#[must_use]
pub fn merge_configs(base: PipelineConfig, overlay: PipelineConfig) -> PipelineConfig {
    let default = PipelineConfig::default();
    PipelineConfig {
        stage: pick(overlay.stage, base.stage, &default.stage),
        notifier_url: overlay.notifier_url.or(base.notifier_url),
        directives_table: pick(overlay.directives_table, base.directives_table, &default.directives_table),
        results_table: pick(overlay.results_table, base.results_table, &default.results_table),
        web_actions_topic: pick(overlay.web_actions_topic, base.web_actions_topic, &default.web_actions_topic),
        notifications_topic: pick(
            overlay.notifications_topic,
            base.notifications_topic,
            &default.notifications_topic,
        ),
        schedules_topic: pick(overlay.schedules_topic, base.schedules_topic, &default.schedules_topic),
        agent_response_topic: pick(
            overlay.agent_response_topic,
            base.agent_response_topic,
            &default.agent_response_topic,
        ),
        web_actions_queue: pick(overlay.web_actions_queue, base.web_actions_queue, &default.web_actions_queue),
        log_level: pick(overlay.log_level, base.log_level, &default.log_level),
        golf_secret_name_template: pick(
            overlay.golf_secret_name_template,
            base.golf_secret_name_template,
            &default.golf_secret_name_template,
        ),
        http_timeout_seconds: if overlay.http_timeout_seconds != default.http_timeout_seconds {
            overlay.http_timeout_seconds
        } else {
            base.http_timeout_seconds
        },
        http_max_retries: if overlay.http_max_retries != default.http_max_retries {
            overlay.http_max_retries
        } else {
            base.http_max_retries
        },
        oauth_cache_ttl_minutes: if overlay.oauth_cache_ttl_minutes != default.oauth_cache_ttl_minutes {
            overlay.oauth_cache_ttl_minutes
        } else {
            base.oauth_cache_ttl_minutes
        },
        secrets_cache_ttl_minutes: if overlay.secrets_cache_ttl_minutes != default.secrets_cache_ttl_minutes {
            overlay.secrets_cache_ttl_minutes
        } else {
            base.secrets_cache_ttl_minutes
        },
    }
}

fn pick(overlay: String, base: String, default: &str) -> String {
    if overlay != default {
        overlay
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. default config is valid but warns about notifier_url ----------
    #[test]
    fn default_config_is_valid_with_warnings() {
        let cfg = PipelineConfig::default();
        let warnings = validate_config(&cfg).unwrap();
        assert!(warnings.iter().any(|w| matches!(w, ConfigWarning::MissingOptionalField { field, .. } if field == "notifier_url")));
    }

    // -- 2. parse valid TOML ------------------------------------------------
    #[test]
    fn parse_valid_toml() {
        let toml = r#"
            stage = "prod"
            log_level = "DEBUG"
            http_timeout_seconds = 10
        "#;
        let cfg = parse_toml(toml).unwrap();
        assert_eq!(cfg.stage, "prod");
        assert_eq!(cfg.log_level, "DEBUG");
        assert_eq!(cfg.http_timeout_seconds, 10);
        // unspecified fields still get their defaults
        assert_eq!(cfg.http_max_retries, 3);
    }

    // -- 3. invalid TOML surfaces a ParseError ------------------------------
    #[test]
    fn invalid_toml_is_parse_error() {
        let err = parse_toml("not [ valid").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    // -- 4. unknown stage/log_level are hard errors -------------------------
    #[test]
    fn unknown_stage_is_validation_error() {
        let cfg = PipelineConfig { stage: "qa".into(), ..Default::default() };
        assert!(matches!(validate_config(&cfg), Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn zero_timeout_is_validation_error() {
        let cfg = PipelineConfig { http_timeout_seconds: 0, ..Default::default() };
        assert!(validate_config(&cfg).is_err());
    }

    // -- 5. merge_configs prefers overlay's non-default values --------------
    #[test]
    fn merge_prefers_overlay_nondefault_values() {
        let base = PipelineConfig { stage: "dev".into(), http_max_retries: 5, ..Default::default() };
        let overlay = PipelineConfig { stage: "prod".into(), ..Default::default() };
        let merged = merge_configs(base, overlay);
        assert_eq!(merged.stage, "prod");
        assert_eq!(merged.http_max_retries, 5);
    }

    // -- 6. env overrides apply on top of file/defaults ---------------------
    #[test]
    fn env_override_applies() {
        std::env::set_var("REZ_AGENT_STAGE", "stage");
        let mut cfg = PipelineConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.stage, "stage");
        std::env::remove_var("REZ_AGENT_STAGE");
    }

    // -- 7. load_config from a real file round-trips -------------------------
    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "stage = \"prod\"\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.stage, "prod");
    }

    #[test]
    fn load_config_missing_file_errors() {
        let err = load_config(Some(Path::new("/nonexistent/path/config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
