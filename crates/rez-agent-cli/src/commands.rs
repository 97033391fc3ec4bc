// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared command implementations for the rez-agent CLI.
//!
//! These functions are library-level so they can be tested without
//! spawning the binary or a daemon.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use ra_core::directive::{Directive, DirectiveKind};
use ra_core::payload::WebActionPayload;
use ra_core::result::ActionResult;
use schemars::schema_for;

/// Schema types that can be printed by the `schema` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// JSON schema for [`WebActionPayload`].
    WebActionPayload,
    /// JSON schema for [`Directive`].
    Directive,
    /// JSON schema for [`ActionResult`].
    Result,
}

/// Return the JSON schema string for the given kind.
pub fn schema_json(kind: SchemaKind) -> Result<String> {
    let value = match kind {
        SchemaKind::WebActionPayload => serde_json::to_value(schema_for!(WebActionPayload))?,
        SchemaKind::Directive => serde_json::to_value(schema_for!(Directive))?,
        SchemaKind::Result => serde_json::to_value(schema_for!(ActionResult))?,
    };
    serde_json::to_string_pretty(&value).context("serialize schema")
}

/// Validate a JSON file against the [`WebActionPayload`] schema and
/// semantic rules (spec §3).
///
/// # Errors
/// Returns an error describing the first validation failure found.
pub fn validate_payload_file(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read file '{}'", path.display()))?;
    let payload: WebActionPayload = serde_json::from_str(&content)
        .with_context(|| format!("parse web_action payload from '{}'", path.display()))?;
    payload.validate().with_context(|| format!("validate web_action payload from '{}'", path.display()))?;
    Ok(())
}

/// A thin HTTP client bound to one daemon instance.
pub struct DaemonClient {
    http: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    /// Build a client pointed at `base_url` (no trailing slash expected).
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build().context("building http client")?;
        Ok(Self { http, base_url: base_url.into() })
    }

    /// Submit a new directive (`POST /v1/directives`).
    ///
    /// # Errors
    /// Returns an error on a network failure or a non-2xx response.
    pub async fn submit_directive(&self, kind: DirectiveKind, payload: serde_json::Value) -> Result<Directive> {
        let response = self
            .http
            .post(format!("{}/v1/directives", self.base_url))
            .json(&serde_json::json!({ "kind": kind, "payload": payload }))
            .send()
            .await
            .context("sending directive to daemon")?;
        response_to_result(response).await
    }

    /// Fetch a directive's current status (`GET /v1/directives/:id`).
    ///
    /// # Errors
    /// Returns an error on a network failure or a non-2xx response.
    pub async fn get_directive(&self, id: &str) -> Result<Directive> {
        let response = self
            .http
            .get(format!("{}/v1/directives/{id}", self.base_url))
            .send()
            .await
            .context("fetching directive from daemon")?;
        response_to_result(response).await
    }

    /// Fetch every result recorded for `message_id` (`GET /v1/results`).
    ///
    /// # Errors
    /// Returns an error on a network failure or a non-2xx response.
    pub async fn get_results(&self, message_id: &str) -> Result<Vec<ActionResult>> {
        let response = self
            .http
            .get(format!("{}/v1/results", self.base_url))
            .query(&[("message_id", message_id)])
            .send()
            .await
            .context("fetching results from daemon")?;
        response_to_result(response).await
    }
}

async fn response_to_result<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("daemon returned {status}: {body}");
    }
    response.json::<T>().await.context("parsing daemon response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // -- 1. every schema kind serializes to valid JSON ------------------
    #[test]
    fn schema_json_produces_valid_json_for_every_kind() {
        for kind in [SchemaKind::WebActionPayload, SchemaKind::Directive, SchemaKind::Result] {
            let rendered = schema_json(kind).unwrap();
            let _: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        }
    }

    // -- 2. a well-formed payload file validates cleanly ------------------
    #[test]
    fn validate_accepts_well_formed_payload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version":"1.0","action":"weather","url":"https://api.weather.gov/x","course_id":null,
               "auth_config":null,"arguments":{{}},"start_search_time":null,"end_search_time":null,
               "num_players":null,"auto_book":false,"tee_sheet_id":null}}"#
        )
        .unwrap();
        validate_payload_file(file.path()).unwrap();
    }

    // -- 3. a payload missing a required field is rejected -----------------
    #[test]
    fn validate_rejects_missing_url() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"version":"1.0","action":"weather"}}"#).unwrap();
        assert!(validate_payload_file(file.path()).is_err());
    }

    // -- 4. a missing file surfaces a readable error, not a panic ----------
    #[test]
    fn validate_missing_file_is_error() {
        assert!(validate_payload_file(Path::new("/nonexistent/payload.json")).is_err());
    }
}
