// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Course catalog loader/validator (spec §3 `Course`, §6 "course catalog
//! file"). Declarative, TOML-formatted, loaded once at startup; each
//! course's `origin` contributes an entry to the HTTP client's allowlist.

use std::path::Path;

use ra_core::course::Course;
use ra_error::RezError;
use serde::Deserialize;

/// The on-disk shape of a course catalog file: a flat list of courses under
/// a repeated `[[course]]` TOML table.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    course: Vec<Course>,
}

/// A loaded, validated course catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    courses: Vec<Course>,
}

impl Catalog {
    /// Load and validate a catalog from a TOML file.
    ///
    /// # Errors
    /// Returns [`RezError::validation`] if the file cannot be read, is
    /// malformed TOML, or fails [`Self::from_courses`] validation.
    pub fn load(path: &Path) -> Result<Self, RezError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RezError::validation(format!("reading course catalog '{}': {e}", path.display())))?;
        Self::parse(&raw)
    }

    /// Parse and validate a catalog from an in-memory TOML document.
    ///
    /// # Errors
    /// Returns [`RezError::validation`] on malformed TOML or a validation failure.
    pub fn parse(raw: &str) -> Result<Self, RezError> {
        let file: CatalogFile =
            toml::from_str(raw).map_err(|e| RezError::validation(format!("malformed course catalog toml: {e}")))?;
        Self::from_courses(file.course)
    }

    /// Build a catalog from an explicit course list, validating uniqueness
    /// of `course_id`/`name` and that every `origin` is a well-formed,
    /// absolute URL with a hostname (spec §9 open question 4: the catalog
    /// is the single source of truth for declared actions).
    ///
    /// # Errors
    /// Returns [`RezError::validation`] on a duplicate id/name or a
    /// malformed `origin`.
    pub fn from_courses(courses: Vec<Course>) -> Result<Self, RezError> {
        let mut seen_ids = std::collections::HashSet::new();
        let mut seen_names = std::collections::HashSet::new();
        for course in &courses {
            if !seen_ids.insert(course.course_id) {
                return Err(RezError::validation(format!("duplicate course_id {}", course.course_id)));
            }
            if !seen_names.insert(course.name.clone()) {
                return Err(RezError::validation(format!("duplicate course name '{}'", course.name)));
            }
            origin_host(&course.origin)?;
        }
        Ok(Self { courses })
    }

    /// Look up a course by its declared name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.name == name)
    }

    /// Look up a course by its numeric id.
    #[must_use]
    pub fn get_by_id(&self, course_id: i64) -> Option<&Course> {
        self.courses.iter().find(|c| c.course_id == course_id)
    }

    /// All loaded courses.
    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Hostnames to add to the HTTP client's allowlist, one per course
    /// `origin` (spec §4.2: "course catalog additions extend the allowlist
    /// at load time").
    #[must_use]
    pub fn allowlist_hosts(&self) -> Vec<String> {
        self.courses.iter().filter_map(|c| origin_host(&c.origin).ok()).collect()
    }
}

fn origin_host(origin: &str) -> Result<String, RezError> {
    let url = url::Url::parse(origin).map_err(|e| RezError::validation(format!("course origin '{origin}' is not a valid url: {e}")))?;
    url.host_str()
        .map(str::to_string)
        .ok_or_else(|| RezError::validation(format!("course origin '{origin}' has no hostname")))
}
