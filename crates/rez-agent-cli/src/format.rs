// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output formatting for directives and results printed by the CLI.

use std::fmt;
use std::str::FromStr;

use ra_core::directive::Directive;
use ra_core::result::ActionResult;
use serde::{Deserialize, Serialize};

/// Supported output formats for CLI display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Compact single-line JSON.
    Json,
    /// Pretty-printed JSON.
    JsonPretty,
    /// Human-readable multi-line text.
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::Text => "text",
        };
        f.write_str(s)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "json-pretty" | "json_pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Formats directive-pipeline types for CLI output.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Create a new formatter with the given output format.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format a [`Directive`] according to the configured output format.
    #[must_use]
    pub fn format_directive(&self, directive: &Directive) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(directive).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(directive).unwrap_or_default(),
            OutputFormat::Text => format!(
                "id={} stage={} kind={:?} status={:?}{}",
                directive.id,
                directive.stage,
                directive.kind,
                directive.status,
                directive.error_message.as_deref().map(|m| format!(" error={m}")).unwrap_or_default()
            ),
        }
    }

    /// Format a list of [`ActionResult`]s according to the configured output format.
    #[must_use]
    pub fn format_results(&self, results: &[ActionResult]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(results).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(results).unwrap_or_default(),
            OutputFormat::Text => {
                if results.is_empty() {
                    return "no results".to_string();
                }
                results
                    .iter()
                    .map(|r| {
                        format!(
                            "action_id={} message_id={} action={} status={:?} http_status={:?}",
                            r.action_id, r.message_id, r.action, r.status, r.http_status_code
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }

    /// Format an error message according to the configured output format.
    #[must_use]
    pub fn format_error(&self, err: &str) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => serde_json::json!({"error": err}).to_string(),
            OutputFormat::Text => format!("error: {err}"),
        }
    }
}
