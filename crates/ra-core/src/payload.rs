//! The execution directive carried by a `web_action` [`crate::Directive`] (spec §3).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ra_error::RezError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthConfig;

/// Current schema version for [`WebActionPayload`]. Bump when the wire
/// shape changes in a backward-incompatible way.
pub const PAYLOAD_VERSION: &str = "1.0";

/// The execution directive for a `web_action` (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WebActionPayload {
    pub version: String,
    pub action: String,
    #[serde(default)]
    pub url: String,
    pub course_id: Option<i64>,
    pub auth_config: Option<AuthConfig>,
    #[serde(default)]
    pub arguments: BTreeMap<String, Value>,
    pub start_search_time: Option<DateTime<Utc>>,
    pub end_search_time: Option<DateTime<Utc>>,
    pub num_players: Option<u32>,
    #[serde(default)]
    pub auto_book: bool,
    pub tee_sheet_id: Option<i64>,
}

impl WebActionPayload {
    /// Start building a payload for the given action name.
    #[must_use]
    pub fn builder(action: impl Into<String>) -> WebActionPayloadBuilder {
        WebActionPayloadBuilder::new(action)
    }

    /// Enforce the structural rules from spec §4.1: non-empty `version`,
    /// non-empty `action`, and (when present) a valid `auth_config`.
    /// URL validation itself is delegated to the HTTP client.
    ///
    /// # Errors
    /// Returns [`RezError::validation`] on the first rule violated.
    pub fn validate(&self) -> Result<(), RezError> {
        if self.version.is_empty() {
            return Err(RezError::validation("payload.version must not be empty"));
        }
        if self.action.is_empty() {
            return Err(RezError::validation("payload.action must not be empty"));
        }
        if let Some(auth) = &self.auth_config {
            auth.validate()?;
        }
        Ok(())
    }

    /// Fetch a free-form argument by key, if present.
    #[must_use]
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// Fetch a free-form string argument by key.
    #[must_use]
    pub fn argument_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Fluent constructor for [`WebActionPayload`], mirroring the builder
/// style used across this codebase for ergonomic test/CLI construction.
#[derive(Debug, Clone)]
pub struct WebActionPayloadBuilder {
    inner: WebActionPayload,
}

impl WebActionPayloadBuilder {
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            inner: WebActionPayload {
                version: PAYLOAD_VERSION.to_string(),
                action: action.into(),
                url: String::new(),
                course_id: None,
                auth_config: None,
                arguments: BTreeMap::new(),
                start_search_time: None,
                end_search_time: None,
                num_players: None,
                auto_book: false,
                tee_sheet_id: None,
            },
        }
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.inner.url = url.into();
        self
    }

    #[must_use]
    pub fn course_id(mut self, course_id: i64) -> Self {
        self.inner.course_id = Some(course_id);
        self
    }

    #[must_use]
    pub fn auth_config(mut self, auth: AuthConfig) -> Self {
        self.inner.auth_config = Some(auth);
        self
    }

    #[must_use]
    pub fn argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.arguments.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn search_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.inner.start_search_time = Some(start);
        self.inner.end_search_time = Some(end);
        self
    }

    #[must_use]
    pub fn num_players(mut self, n: u32) -> Self {
        self.inner.num_players = Some(n);
        self
    }

    #[must_use]
    pub fn auto_book(mut self, auto_book: bool) -> Self {
        self.inner.auto_book = auto_book;
        self
    }

    #[must_use]
    pub fn tee_sheet_id(mut self, id: i64) -> Self {
        self.inner.tee_sheet_id = Some(id);
        self
    }

    #[must_use]
    pub fn build(self) -> WebActionPayload {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- 1. builder defaults to the current schema version ---------------
    #[test]
    fn builder_sets_current_version() {
        let payload = WebActionPayload::builder("weather").build();
        assert_eq!(payload.version, PAYLOAD_VERSION);
        assert_eq!(payload.action, "weather");
    }

    // -- 2. empty version or action fails validation ----------------------
    #[test]
    fn empty_version_or_action_is_invalid() {
        let mut payload = WebActionPayload::builder("weather").build();
        payload.version.clear();
        assert!(payload.validate().is_err());

        let mut payload = WebActionPayload::builder("").build();
        payload.version = PAYLOAD_VERSION.to_string();
        assert!(payload.validate().is_err());
    }

    // -- 3. invalid nested auth_config propagates as a validation error --
    #[test]
    fn invalid_auth_config_propagates() {
        let payload = WebActionPayload::builder("golf")
            .auth_config(AuthConfig { auth_type: Some(crate::auth::AuthType::OauthPassword), ..Default::default() })
            .build();
        assert!(payload.validate().is_err());
    }

    // -- 4. ParseWebActionPayload(Serialize(p)) == p (spec §8 round-trip law) --
    #[test]
    fn round_trip_preserves_equality() {
        let payload = WebActionPayload::builder("golf")
            .course_id(7)
            .auth_config(AuthConfig::oauth_password("https://t", "s"))
            .argument("operation", json!("fetch_reservations"))
            .num_players(3)
            .auto_book(true)
            .tee_sheet_id(42)
            .build();
        let json = serde_json::to_string(&payload).unwrap();
        let back: WebActionPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }

    // -- 5. argument accessors -------------------------------------------
    #[test]
    fn argument_accessors() {
        let payload = WebActionPayload::builder("golf")
            .argument("operation", json!("search_tee_times"))
            .build();
        assert_eq!(payload.argument_str("operation"), Some("search_tee_times"));
        assert!(payload.argument("missing").is_none());
    }
}
