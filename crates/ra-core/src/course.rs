//! [`Course`] — a catalog entry loaded once at startup (spec §3).
//!
//! Loading the catalog file itself lives in `ra-catalog`; this module only
//! holds the data shape so it can be shared by `ra-http` (allowlist seeding),
//! `ra-oauth` (secret-name derivation), and `ra-handlers` (endpoint lookup).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use ra_error::RezError;

use crate::stage::Stage;

/// A declared request template bound to a course (spec §9 open question 4:
/// the catalog is the single source of truth for which operations a course
/// supports).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CourseAction {
    /// Operation name, e.g. `fetch_reservations`, `search_tee_times`, `book_tee_time`.
    pub name: String,
    /// Path relative to the course's `origin`.
    pub path: String,
    /// HTTP method, upper-case (`GET`, `POST`).
    pub method: String,
}

/// One course catalog entry (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Course {
    pub course_id: i64,
    pub name: String,
    /// Base URL; also an entry contributed to the HTTP client allowlist.
    pub origin: String,
    pub client_id: String,
    pub website_id: String,
    pub scope: String,
    pub actions: Vec<CourseAction>,
}

impl Course {
    /// Look up a declared action by name.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&CourseAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Enforce that `name` is a declared action for this course before a
    /// handler constructs a URL from it (spec §9 open question 4).
    ///
    /// # Errors
    /// Returns [`RezError::validation`] if the action is not declared.
    pub fn require_action(&self, name: &str) -> Result<&CourseAction, RezError> {
        self.action(name).ok_or_else(|| {
            RezError::validation(format!("course '{}' does not declare action '{name}'", self.name))
        })
    }

    /// Secret-store key for this course's OAuth credentials at `stage`
    /// (spec §3: `GetSecretName(stage) -> "rez-agent/golf/<course>/credentials-<stage>"`).
    #[must_use]
    pub fn secret_name(&self, stage: Stage) -> String {
        format!("rez-agent/golf/{}/credentials-{}", self.name, stage.as_str())
    }

    /// Join `origin` and a declared action's relative path into a full URL.
    #[must_use]
    pub fn action_url(&self, action: &CourseAction) -> String {
        format!("{}{}", self.origin.trim_end_matches('/'), ensure_leading_slash(&action.path))
    }
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
