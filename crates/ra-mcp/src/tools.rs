//! The five tool descriptors this core binds (spec §4.12, §6 tool table)
//! and the `tools/call arguments -> WebActionPayload` mapping.
//!
//! Golf tools address a course by `course_name`, not `course_id` — the
//! catalog is the only place that translation happens. OAuth endpoints for
//! golf actions are not part of the catalog record; this binding derives
//! them from the course origin by convention (`<origin>/oauth/token`,
//! `<origin>/oauth/jwks`) and the course's templated secret name. See
//! `DESIGN.md` for the open-question resolution.

use chrono::{DateTime, Utc};
use ra_catalog::Catalog;
use ra_core::auth::AuthConfig;
use ra_core::course::Course;
use ra_core::payload::WebActionPayload;
use ra_core::stage::Stage;
use ra_error::RezError;
use serde_json::Value;

use crate::schema::{Format, InputSchema, PropertySchema, PropertyType, ToolDescriptor};

/// Tool name: push notification (spec §6).
pub const SEND_PUSH_NOTIFICATION: &str = "send_push_notification";
/// Tool name: weather forecast summary (spec §6).
pub const GET_WEATHER: &str = "get_weather";
/// Tool name: list upcoming golf reservations (spec §6).
pub const GOLF_GET_RESERVATIONS: &str = "golf_get_reservations";
/// Tool name: search tee time availability (spec §6).
pub const GOLF_SEARCH_TEE_TIMES: &str = "golf_search_tee_times";
/// Tool name: book a tee time (spec §6).
pub const GOLF_BOOK_TEE_TIME: &str = "golf_book_tee_time";

/// The descriptors bound by `tools/list` (spec §6 tool table).
#[must_use]
pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: SEND_PUSH_NOTIFICATION,
            description: "Send a push notification through the configured notifier endpoint.",
            input_schema: InputSchema::new()
                .property("message", PropertySchema::new(PropertyType::String), true)
                .property("title", PropertySchema::new(PropertyType::String), false)
                .property(
                    "priority",
                    PropertySchema::new(PropertyType::String)
                        .enum_values(vec!["low", "default", "high"])
                        .default(Value::String("default".to_string())),
                    false,
                ),
        },
        ToolDescriptor {
            name: GET_WEATHER,
            description: "Fetch and summarize a forecast from the given forecast URL.",
            input_schema: InputSchema::new()
                .property("location", PropertySchema::new(PropertyType::String).format(Format::Url), true)
                .property(
                    "days",
                    PropertySchema::new(PropertyType::Integer).range(1.0, 7.0).default(Value::from(2)),
                    false,
                ),
        },
        ToolDescriptor {
            name: GOLF_GET_RESERVATIONS,
            description: "List upcoming tee time reservations for a course.",
            input_schema: InputSchema::new().property("course_name", PropertySchema::new(PropertyType::String), true),
        },
        ToolDescriptor {
            name: GOLF_SEARCH_TEE_TIMES,
            description: "Search for available tee times at a course within a time window.",
            input_schema: InputSchema::new()
                .property("course_name", PropertySchema::new(PropertyType::String), true)
                .property("start_time", PropertySchema::new(PropertyType::String), true)
                .property("end_time", PropertySchema::new(PropertyType::String), true)
                .property("num_players", PropertySchema::new(PropertyType::Integer).range(1.0, 4.0), true)
                .property(
                    "auto_book",
                    PropertySchema::new(PropertyType::Boolean).default(Value::Bool(false)),
                    false,
                ),
        },
        ToolDescriptor {
            name: GOLF_BOOK_TEE_TIME,
            description: "Book a previously-found tee time.",
            input_schema: InputSchema::new()
                .property("course_name", PropertySchema::new(PropertyType::String), true)
                .property("tee_sheet_id", PropertySchema::new(PropertyType::Integer), true),
        },
    ]
}

fn resolve_course<'a>(arguments: &Value, catalog: &'a Catalog) -> Result<&'a Course, RezError> {
    let name = arguments
        .get("course_name")
        .and_then(Value::as_str)
        .ok_or_else(|| RezError::validation("course_name is required"))?;
    catalog.get_by_name(name).ok_or_else(|| RezError::validation(format!("unknown course '{name}'")))
}

fn golf_auth_config(course: &Course, stage: Stage, require_jwks: bool) -> AuthConfig {
    let origin = course.origin.trim_end_matches('/');
    let mut auth =
        AuthConfig::oauth_password(format!("{origin}/oauth/token"), course.secret_name(stage)).with_scope(course.scope.clone());
    if require_jwks {
        auth = auth.with_jwks_url(format!("{origin}/oauth/jwks"));
    }
    auth
}

fn rfc3339_arg(arguments: &Value, key: &str) -> Result<DateTime<Utc>, RezError> {
    let raw = arguments.get(key).and_then(Value::as_str).ok_or_else(|| RezError::validation(format!("{key} is required")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RezError::validation(format!("{key} is not a valid RFC3339 timestamp: {e}")))
}

/// Build the `WebActionPayload` a tool call maps to (spec §4.12: "each tool
/// constructs a `WebActionPayload` and invokes the same handler the worker
/// uses").
///
/// # Errors
/// Returns [`RezError::validation`] if a required argument is absent,
/// malformed, or names an unknown course.
pub fn build_payload(
    tool_name: &str,
    arguments: &Value,
    catalog: &Catalog,
    stage: Stage,
    notifier_url: &str,
) -> Result<WebActionPayload, RezError> {
    match tool_name {
        SEND_PUSH_NOTIFICATION => {
            let message = arguments
                .get("message")
                .and_then(Value::as_str)
                .ok_or_else(|| RezError::validation("message is required"))?;
            let mut builder = WebActionPayload::builder("notify").url(notifier_url).argument("message", Value::String(message.to_string()));
            if let Some(title) = arguments.get("title").and_then(Value::as_str) {
                builder = builder.argument("title", Value::String(title.to_string()));
            }
            let priority = arguments.get("priority").and_then(Value::as_str).unwrap_or("default");
            builder = builder.argument("priority", Value::String(priority.to_string()));
            Ok(builder.build())
        }
        GET_WEATHER => {
            let location = arguments
                .get("location")
                .and_then(Value::as_str)
                .ok_or_else(|| RezError::validation("location is required"))?;
            let days = arguments.get("days").and_then(Value::as_u64).unwrap_or(2);
            Ok(WebActionPayload::builder("weather").url(location).argument("days", Value::from(days)).build())
        }
        GOLF_GET_RESERVATIONS => {
            let course = resolve_course(arguments, catalog)?;
            let auth = golf_auth_config(course, stage, false);
            Ok(WebActionPayload::builder("golf")
                .course_id(course.course_id)
                .auth_config(auth)
                .argument("operation", Value::String("fetch_reservations".to_string()))
                .build())
        }
        GOLF_SEARCH_TEE_TIMES => {
            let course = resolve_course(arguments, catalog)?;
            let auth = golf_auth_config(course, stage, false);
            let start = rfc3339_arg(arguments, "start_time")?;
            let end = rfc3339_arg(arguments, "end_time")?;
            let num_players = arguments
                .get("num_players")
                .and_then(Value::as_u64)
                .ok_or_else(|| RezError::validation("num_players is required"))? as u32;
            let auto_book = arguments.get("auto_book").and_then(Value::as_bool).unwrap_or(false);
            Ok(WebActionPayload::builder("golf")
                .course_id(course.course_id)
                .auth_config(auth)
                .argument("operation", Value::String("search_tee_times".to_string()))
                .search_window(start, end)
                .num_players(num_players)
                .auto_book(auto_book)
                .build())
        }
        GOLF_BOOK_TEE_TIME => {
            let course = resolve_course(arguments, catalog)?;
            let auth = golf_auth_config(course, stage, true);
            let tee_sheet_id = arguments
                .get("tee_sheet_id")
                .and_then(Value::as_i64)
                .ok_or_else(|| RezError::validation("tee_sheet_id is required"))?;
            Ok(WebActionPayload::builder("golf")
                .course_id(course.course_id)
                .auth_config(auth)
                .argument("operation", Value::String("book_tee_time".to_string()))
                .tee_sheet_id(tee_sheet_id)
                .build())
        }
        other => Err(RezError::validation(format!("unknown tool '{other}'"))),
    }
}

/// The action-handler name a tool call ultimately executes (spec §4.7).
#[must_use]
pub fn handler_action_for(tool_name: &str) -> Option<&'static str> {
    match tool_name {
        SEND_PUSH_NOTIFICATION => Some("notify"),
        GET_WEATHER => Some("weather"),
        GOLF_GET_RESERVATIONS | GOLF_SEARCH_TEE_TIMES | GOLF_BOOK_TEE_TIME => Some("golf"),
        _ => None,
    }
}
