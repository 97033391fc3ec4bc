//! [`ActionResult`] — the output record for one web-action execution (spec §3).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use ra_error::RezError;

use crate::directive::time_prefixed_id;
use crate::stage::Stage;

/// Cap on `response_body` storage: 400 KiB (spec §3).
pub const MAX_RESPONSE_BODY_BYTES: usize = 400 * 1024;

/// Upper bound on `ttl - executed_at`: 3 days (spec §3, §8 invariant 7).
pub const MAX_RESULT_TTL_SECONDS: i64 = 3 * 24 * 60 * 60;

/// Outcome of a handler execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Failed,
}

/// Output record for a single web-action execution (spec §3).
///
/// `action_id` is the primary key; `message_id` is a secondary-indexed
/// back-reference to the originating [`crate::Directive`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActionResult {
    pub action_id: String,
    pub message_id: String,
    pub action: String,
    pub url: String,
    pub stage: Stage,
    pub status: ResultStatus,
    pub http_status_code: Option<u16>,
    /// Raw upstream body, capped at [`MAX_RESPONSE_BODY_BYTES`]. Handlers
    /// opt in per-action (spec §9 open question 5); `None` when the handler
    /// chose not to retain it.
    #[serde(default)]
    pub response_body: Option<String>,
    /// Human-readable text produced by the handler; always populated on
    /// success.
    #[serde(default)]
    pub transformed_result: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Absolute expiration, unix seconds. The store must delete the record
    /// once past this instant.
    pub ttl: i64,
}

impl ActionResult {
    /// Build a `success` result. `ttl_seconds` must be in `(0, 259_200]`
    /// (spec §8 invariant 7); callers pick the per-action default (weather:
    /// 3 days; golf: 24h, spec §9 open question 5).
    ///
    /// # Errors
    /// Returns [`RezError::validation`] if `ttl_seconds` is out of range.
    #[allow(clippy::too_many_arguments)]
    pub fn success(
        message_id: impl Into<String>,
        action: impl Into<String>,
        url: impl Into<String>,
        stage: Stage,
        http_status_code: u16,
        transformed_result: impl Into<String>,
        response_body: Option<String>,
        duration_ms: u64,
        ttl_seconds: i64,
    ) -> Result<Self, RezError> {
        let executed_at = Utc::now();
        let ttl = compute_ttl(executed_at, ttl_seconds)?;
        Ok(Self {
            action_id: time_prefixed_id(executed_at),
            message_id: message_id.into(),
            action: action.into(),
            url: url.into(),
            stage,
            status: ResultStatus::Success,
            http_status_code: Some(http_status_code),
            response_body: response_body.map(|b| truncate_response_body(&b)),
            transformed_result: Some(transformed_result.into()),
            error_message: None,
            executed_at,
            duration_ms,
            ttl,
        })
    }

    /// Build a `failed` result.
    ///
    /// # Errors
    /// Returns [`RezError::validation`] if `ttl_seconds` is out of range.
    pub fn failed(
        message_id: impl Into<String>,
        action: impl Into<String>,
        url: impl Into<String>,
        stage: Stage,
        http_status_code: Option<u16>,
        error_message: impl Into<String>,
        duration_ms: u64,
        ttl_seconds: i64,
    ) -> Result<Self, RezError> {
        let executed_at = Utc::now();
        let ttl = compute_ttl(executed_at, ttl_seconds)?;
        Ok(Self {
            action_id: time_prefixed_id(executed_at),
            message_id: message_id.into(),
            action: action.into(),
            url: url.into(),
            stage,
            status: ResultStatus::Failed,
            http_status_code,
            response_body: None,
            transformed_result: None,
            error_message: Some(error_message.into()),
            executed_at,
            duration_ms,
            ttl,
        })
    }

    /// `true` if `ttl` has passed relative to `now`; a store implementation
    /// uses this to decide whether a record is logically expired even if
    /// physical deletion has not yet run.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.ttl
    }
}

fn compute_ttl(executed_at: DateTime<Utc>, ttl_seconds: i64) -> Result<i64, RezError> {
    if ttl_seconds <= 0 || ttl_seconds > MAX_RESULT_TTL_SECONDS {
        return Err(RezError::validation(format!(
            "result ttl_seconds must be in (0, {MAX_RESULT_TTL_SECONDS}], got {ttl_seconds}"
        )));
    }
    Ok(executed_at.timestamp() + ttl_seconds)
}

/// Truncate a response body to [`MAX_RESPONSE_BODY_BYTES`] on a UTF-8
/// boundary, never silently corrupting multi-byte characters.
#[must_use]
pub fn truncate_response_body(body: &str) -> String {
    if body.len() <= MAX_RESPONSE_BODY_BYTES {
        return body.to_string();
    }
    let mut end = MAX_RESPONSE_BODY_BYTES;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
