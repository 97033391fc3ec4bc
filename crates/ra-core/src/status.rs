//! Directive-status state machine (spec §4.13).
//!
//! ```text
//! created → queued         (ingress after publish)
//! queued → processing      (worker claim)
//! processing → completed   (handler success + result saved)
//! processing → failed      (permanent error path)
//! processing → queued      (transient error path; via retry_count++)
//! ```
//!
//! Terminal states (`completed`, `failed`) accept no further transitions;
//! an attempt to transition out of one is a silent no-op so at-least-once
//! redelivery never re-executes a finished directive.

use serde::{Deserialize, Serialize};

use ra_error::RezError;

/// A directive's position in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveStatus {
    Created,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl DirectiveStatus {
    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DirectiveStatus::Completed | DirectiveStatus::Failed)
    }
}

/// Result of attempting a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was legal and has been applied.
    Applied,
    /// The directive was already terminal; no change was made. Callers
    /// must treat this as success, not as an error (supports
    /// at-least-once delivery).
    NoopTerminal,
}

/// Validate a proposed transition without applying it.
///
/// # Errors
/// Returns [`RezError::validation`] if `from` is non-terminal and `to` is
/// not one of the legal successor states for `from`.
pub fn check_transition(
    from: DirectiveStatus,
    to: DirectiveStatus,
) -> Result<TransitionOutcome, RezError> {
    if from.is_terminal() {
        return Ok(TransitionOutcome::NoopTerminal);
    }
    let legal = matches!(
        (from, to),
        (DirectiveStatus::Created, DirectiveStatus::Queued)
            | (DirectiveStatus::Queued, DirectiveStatus::Processing)
            | (DirectiveStatus::Processing, DirectiveStatus::Completed)
            | (DirectiveStatus::Processing, DirectiveStatus::Failed)
            | (DirectiveStatus::Processing, DirectiveStatus::Queued)
    );
    if legal {
        Ok(TransitionOutcome::Applied)
    } else {
        Err(RezError::validation(format!(
            "illegal directive status transition {from:?} -> {to:?}"
        )))
    }
}
