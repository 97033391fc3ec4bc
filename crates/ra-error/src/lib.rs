// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Unified error taxonomy shared across the rez-agent pipeline.
//!
//! Every fallible operation in `ra-http`, `ra-oauth`, `ra-store`,
//! `ra-handlers`, `ra-worker`, and `ra-mcp` ultimately produces a
//! [`RezError`] tagged with one of the [`ErrorKind`] variants below. The
//! worker and the MCP server dispatch on `kind()` alone; they never match
//! on error message text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable classification tag for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Payload or arguments malformed. Permanent.
    Validation,
    /// OAuth rejected credentials or JWT failed verification. Permanent;
    /// the caller must invalidate the cached token.
    Unauthorized,
    /// 5xx/429/timeout from an allowlisted host. Retried.
    UpstreamTransient,
    /// 4xx other than 429. Permanent.
    UpstreamPermanent,
    /// SSRF guard refused the request. Permanent; logged as a security event.
    Blocked,
    /// Conditional write rejected. Treated as "another actor owns it".
    StoreConflict,
    /// Store throttling or transport failure. Retried via envelope redelivery.
    StoreUnavailable,
    /// Unclassified.
    Internal,
}

impl ErrorKind {
    /// Stable string code, safe to surface in logs, JSON-RPC `error.data.code`,
    /// and metrics labels.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::UpstreamTransient => "upstream_transient",
            ErrorKind::UpstreamPermanent => "upstream_permanent",
            ErrorKind::Blocked => "blocked",
            ErrorKind::StoreConflict => "store_conflict",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::Internal => "internal",
        }
    }

    /// Whether the worker should re-deliver the envelope (spec §4.14)
    /// rather than writing a terminal `failed` result.
    #[must_use]
    pub fn retryable(self) -> bool {
        matches!(self, ErrorKind::UpstreamTransient | ErrorKind::StoreUnavailable)
    }

    /// Whether this kind represents "another actor already owns it",
    /// which the worker converts to success rather than failure.
    #[must_use]
    pub fn is_store_conflict(self) -> bool {
        matches!(self, ErrorKind::StoreConflict)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified error carrying an optional correlation id for cross-log
/// tracing.
///
/// `message` must never contain token material, secret values, or raw
/// upstream bodies that might carry credentials; callers scrub before
/// constructing one.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RezError {
    kind: ErrorKind,
    message: String,
    correlation_id: Option<String>,
}

impl RezError {
    /// Build an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), correlation_id: None }
    }

    /// Attach a correlation id, returning `self` for chaining.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Shorthand for [`ErrorKind::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Shorthand for [`ErrorKind::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Shorthand for [`ErrorKind::UpstreamTransient`].
    pub fn upstream_transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamTransient, message)
    }

    /// Shorthand for [`ErrorKind::UpstreamPermanent`].
    pub fn upstream_permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamPermanent, message)
    }

    /// Shorthand for [`ErrorKind::Blocked`].
    pub fn blocked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Blocked, message)
    }

    /// Shorthand for [`ErrorKind::StoreConflict`].
    pub fn store_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreConflict, message)
    }

    /// Shorthand for [`ErrorKind::StoreUnavailable`].
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreUnavailable, message)
    }

    /// Shorthand for [`ErrorKind::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// The classification tag.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The scrubbed human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The correlation id, if one was attached.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Whether the worker should retry this operation.
    #[must_use]
    pub fn retryable(&self) -> bool {
        self.kind.retryable()
    }
}

impl From<serde_json::Error> for RezError {
    fn from(err: serde_json::Error) -> Self {
        RezError::validation(format!("malformed json: {err}"))
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RezError>;
