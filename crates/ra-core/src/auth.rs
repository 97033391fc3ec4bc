//! Pluggable auth metadata attached to a [`crate::WebActionPayload`] (spec §3).

use std::collections::BTreeMap;

use ra_error::RezError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which auth strategy a web action requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    None,
    OauthPassword,
    BearerToken,
    ApiKey,
}

/// Auth configuration for a single web action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub auth_type: Option<AuthType>,
    pub token_url: Option<String>,
    pub secret_name: Option<String>,
    pub scope: Option<String>,
    pub jwks_url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl AuthConfig {
    /// Construct an `oauth_password` auth config.
    #[must_use]
    pub fn oauth_password(token_url: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            auth_type: Some(AuthType::OauthPassword),
            token_url: Some(token_url.into()),
            secret_name: Some(secret_name.into()),
            ..Self::default()
        }
    }

    /// Attach a scope string, returning `self` for chaining.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Attach a JWKS verification endpoint, returning `self` for chaining.
    #[must_use]
    pub fn with_jwks_url(mut self, jwks_url: impl Into<String>) -> Self {
        self.jwks_url = Some(jwks_url.into());
        self
    }

    /// `true` if a JWKS-verified token is required for this auth config
    /// (spec §4.9 — `book_tee_time` requires this).
    #[must_use]
    pub fn requires_jwks_verification(&self) -> bool {
        self.jwks_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Validate field combinations required by `auth_type` (spec §4.1:
    /// "validators that reject payloads where required fields by-action
    /// are missing, e.g. `oauth_password` without `token_url`").
    ///
    /// # Errors
    /// Returns [`RezError::validation`] if a required field for the
    /// configured `auth_type` is missing or empty.
    pub fn validate(&self) -> Result<(), RezError> {
        match self.auth_type {
            None | Some(AuthType::None) => Ok(()),
            Some(AuthType::OauthPassword) => {
                require_nonempty(self.token_url.as_deref(), "token_url")?;
                require_nonempty(self.secret_name.as_deref(), "secret_name")?;
                Ok(())
            }
            Some(AuthType::BearerToken) | Some(AuthType::ApiKey) => {
                require_nonempty(self.secret_name.as_deref(), "secret_name")
            }
        }
    }
}

fn require_nonempty(value: Option<&str>, field: &str) -> Result<(), RezError> {
    match value {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(RezError::validation(format!("auth_config.{field} is required"))),
    }
}
