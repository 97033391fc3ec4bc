// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Domain model for the rez-agent web-action pipeline.
//!
//! [`Directive`] is the unit of work; a `web_action` directive carries a
//! [`WebActionPayload`] describing what to execute and with which
//! [`AuthConfig`]. [`ActionResult`] is the durable output record a worker
//! writes after executing a handler. [`Course`] is a catalog entry used by
//! the golf handler. [`status`] implements the directive status state
//! machine (spec §4.13).

pub mod auth;
pub mod course;
pub mod directive;
pub mod hash;
pub mod payload;
pub mod result;
pub mod stage;
pub mod status;

pub use auth::{AuthConfig, AuthType};
pub use course::{Course, CourseAction};
pub use directive::{time_prefixed_id, Directive, DirectiveKind};
pub use payload::{WebActionPayload, WebActionPayloadBuilder, PAYLOAD_VERSION};
pub use result::{ActionResult, ResultStatus, MAX_RESPONSE_BODY_BYTES, MAX_RESULT_TTL_SECONDS};
pub use stage::Stage;
pub use status::{check_transition, DirectiveStatus, TransitionOutcome};

/// Errors local to serialization/hashing helpers in this crate. Business
/// errors use [`ra_error::RezError`] throughout.
#[derive(Debug, thiserror::Error)]
pub enum RaCoreError {
    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
