//! [`Directive`] — the unit of work moved through the pipeline (spec §3).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ra_error::RezError;

use crate::stage::Stage;
use crate::status::DirectiveStatus;

/// The kind of directive. Only [`DirectiveKind::WebAction`] is executed by
/// this core; the others are accepted and passed through as opaque payloads
/// (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Hello,
    Notify,
    Scheduled,
    WebAction,
    AgentResponse,
    ScheduleCreation,
}

impl DirectiveKind {
    /// `true` for the one kind this core's worker executes.
    #[must_use]
    pub fn is_web_action(self) -> bool {
        matches!(self, DirectiveKind::WebAction)
    }
}

/// A persisted unit of work (spec §3).
///
/// `payload` is stored as a JSON string: for [`DirectiveKind::WebAction`] it
/// deserializes as a [`crate::WebActionPayload`]; for every other kind it is
/// opaque to this core and simply carried through.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Directive {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub stage: Stage,
    pub kind: DirectiveKind,
    pub status: DirectiveStatus,
    pub payload: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

impl Directive {
    /// Construct a new directive in the `created` status with a
    /// time-prefixed id for rough chronological ordering (spec §3).
    ///
    /// # Errors
    /// Returns [`RezError::validation`] if `payload` cannot be serialized.
    pub fn new<T: Serialize>(stage: Stage, kind: DirectiveKind, payload: &T) -> Result<Self, RezError> {
        let now = Utc::now();
        Ok(Self {
            id: time_prefixed_id(now),
            created_at: now,
            updated_at: now,
            stage,
            kind,
            status: DirectiveStatus::Created,
            payload: serde_json::to_string(payload)
                .map_err(|e| RezError::validation(format!("directive payload not serializable: {e}")))?,
            error_message: None,
            retry_count: 0,
        })
    }

    /// Construct a directive with an opaque string payload (used for
    /// non-`web_action` kinds such as `notify`).
    #[must_use]
    pub fn new_opaque(stage: Stage, kind: DirectiveKind, payload: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: time_prefixed_id(now),
            created_at: now,
            updated_at: now,
            stage,
            kind,
            status: DirectiveStatus::Created,
            payload: payload.into(),
            error_message: None,
            retry_count: 0,
        }
    }

    /// Deserialize `payload` as a [`crate::WebActionPayload`].
    ///
    /// # Errors
    /// Returns [`RezError::validation`] on malformed JSON or if `kind` is
    /// not [`DirectiveKind::WebAction`].
    pub fn web_action_payload(&self) -> Result<crate::WebActionPayload, RezError> {
        if !self.kind.is_web_action() {
            return Err(RezError::validation(format!(
                "directive {} is not a web_action (kind={:?})",
                self.id, self.kind
            )));
        }
        serde_json::from_str(&self.payload)
            .map_err(|e| RezError::validation(format!("malformed web_action payload: {e}")))
    }
}

/// Time-prefixed unique id: `<millis-since-epoch>-<uuid-suffix>`, giving
/// rough chronological ordering when sorted lexicographically by id for ids
/// generated within the same era (spec §3).
#[must_use]
pub fn time_prefixed_id(at: DateTime<Utc>) -> String {
    format!("{:013}-{}", at.timestamp_millis().max(0), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::WebActionPayload;

    // -- 1. new() stores a serialized, round-trippable payload ------------
    #[test]
    fn new_serializes_and_reloads_payload() {
        let payload = WebActionPayload::builder("weather").url("https://api.weather.gov/x").build();
        let d = Directive::new(Stage::Dev, DirectiveKind::WebAction, &payload).unwrap();
        assert_eq!(d.status, DirectiveStatus::Created);
        assert_eq!(d.retry_count, 0);
        let back = d.web_action_payload().unwrap();
        assert_eq!(back, payload);
    }

    // -- 2. web_action_payload rejects non-web_action kinds ----------------
    #[test]
    fn web_action_payload_rejects_wrong_kind() {
        let d = Directive::new_opaque(Stage::Dev, DirectiveKind::Notify, "hi");
        assert!(d.web_action_payload().is_err());
    }

    // -- 3. time_prefixed_id is monotonic-ish and unique -------------------
    #[test]
    fn time_prefixed_id_unique_across_calls() {
        let now = Utc::now();
        let a = time_prefixed_id(now);
        let b = time_prefixed_id(now);
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("{:013}", now.timestamp_millis())));
    }

    // -- 4. is_web_action is precise ---------------------------------------
    #[test]
    fn is_web_action_precise() {
        assert!(DirectiveKind::WebAction.is_web_action());
        assert!(!DirectiveKind::Notify.is_web_action());
        assert!(!DirectiveKind::Hello.is_web_action());
    }
}
