//! `golf` action handler (spec §4.9).
//!
//! Operation selected by `payload.arguments["operation"]`: `fetch_reservations`,
//! `search_tee_times`, `book_tee_time`. All three resolve their course from
//! the catalog by `payload.course_id`, obtain a bearer token via `ra_oauth`,
//! and never hand a booking confirmation back without a JWKS-verified token.

use chrono::{DateTime, Utc};
use ra_core::course::{Course, CourseAction};
use ra_core::payload::WebActionPayload;
use ra_error::RezError;
use ra_http::RequestConfig;
use serde::Deserialize;

use crate::{ActionHandler, HandlerContext};

const MIN_PLAYERS: u32 = 1;
const MAX_PLAYERS: u32 = 4;
const MAX_RESERVATIONS_SHOWN: usize = 4;

/// Executes golf-course reservation/search/booking operations (spec §4.9).
pub struct GolfHandler;

#[async_trait::async_trait]
impl ActionHandler for GolfHandler {
    async fn execute(&self, ctx: &HandlerContext, payload: &WebActionPayload) -> Result<Vec<String>, RezError> {
        let operation = payload
            .argument_str("operation")
            .ok_or_else(|| RezError::validation("golf action requires arguments.operation"))?;

        let course = resolve_course(ctx, payload)?;

        match operation {
            "fetch_reservations" => fetch_reservations(ctx, payload, course).await,
            "search_tee_times" => search_tee_times(ctx, payload, course).await,
            "book_tee_time" => book_tee_time(ctx, payload, course).await,
            other => Err(RezError::validation(format!("unknown golf operation '{other}'"))),
        }
    }
}

fn resolve_course<'a>(ctx: &'a HandlerContext, payload: &WebActionPayload) -> Result<&'a Course, RezError> {
    let course_id = payload.course_id.ok_or_else(|| RezError::validation("golf action requires payload.course_id"))?;
    ctx.catalog.get_by_id(course_id).ok_or_else(|| RezError::validation(format!("unknown course_id {course_id}")))
}

async fn bearer_token(ctx: &HandlerContext, payload: &WebActionPayload) -> Result<String, RezError> {
    let auth = payload.auth_config.as_ref().ok_or_else(|| RezError::validation("golf action requires auth_config"))?;
    let token = ctx.oauth.get_token(auth).await?;
    Ok(token.access_token)
}

async fn get_json(ctx: &HandlerContext, course: &Course, action: &CourseAction, token: &str) -> Result<serde_json::Value, RezError> {
    let mut req = RequestConfig::get(course.action_url(action)).bearer(token);
    req.timeout = Some(ctx.deadline.remaining());
    let resp = ctx.http.execute(req).await?;
    resp.json()
}

#[derive(Debug, Deserialize)]
struct ReservationsResponse {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize, Clone)]
struct Reservation {
    course_name: String,
    tee_time: DateTime<Utc>,
    num_players: u32,
    confirmation_number: String,
}

async fn fetch_reservations(ctx: &HandlerContext, payload: &WebActionPayload, course: &Course) -> Result<Vec<String>, RezError> {
    let action = course.require_action("fetch_reservations")?;
    let token = bearer_token(ctx, payload).await?;
    let body = get_json(ctx, course, action, &token).await?;
    let parsed: ReservationsResponse = serde_json::from_value(body).map_err(RezError::from)?;

    let mut reservations = parsed.reservations;
    reservations.sort_by_key(|r| r.tee_time);

    let now = Utc::now();
    let lines: Vec<String> = reservations
        .iter()
        .take(MAX_RESERVATIONS_SHOWN)
        .enumerate()
        .map(|(i, r)| {
            let prefix = day_prefix(now, r.tee_time);
            format!(
                "{}. {}{} — {} ({} player{}, confirmation {})",
                i + 1,
                prefix,
                r.tee_time.format("%Y-%m-%d %H:%M"),
                r.course_name,
                r.num_players,
                if r.num_players == 1 { "" } else { "s" },
                r.confirmation_number,
            )
        })
        .collect();

    Ok(vec![lines.join("\n")])
}

fn day_prefix(now: DateTime<Utc>, tee_time: DateTime<Utc>) -> String {
    let today = now.date_naive();
    let tee_day = tee_time.date_naive();
    if tee_day == today {
        "TODAY ".to_string()
    } else if tee_day == today.succ_opt().unwrap_or(today) {
        "TOMORROW ".to_string()
    } else {
        String::new()
    }
}

#[derive(Debug, Deserialize)]
struct TeeTimesResponse {
    #[serde(default)]
    tee_times: Vec<TeeTime>,
}

#[derive(Debug, Deserialize, Clone)]
struct TeeTime {
    time: DateTime<Utc>,
    available_slots: u32,
}

async fn search_tee_times(ctx: &HandlerContext, payload: &WebActionPayload, course: &Course) -> Result<Vec<String>, RezError> {
    let action = course.require_action("search_tee_times")?;
    let token = bearer_token(ctx, payload).await?;

    let start = payload.start_search_time.ok_or_else(|| RezError::validation("search_tee_times requires start_search_time"))?;
    let end = payload.end_search_time.ok_or_else(|| RezError::validation("search_tee_times requires end_search_time"))?;
    let num_players = payload.num_players.ok_or_else(|| RezError::validation("search_tee_times requires num_players"))?;
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players) {
        return Err(RezError::validation(format!("num_players must be in [{MIN_PLAYERS}, {MAX_PLAYERS}], got {num_players}")));
    }
    if end <= start {
        return Err(RezError::validation("end_search_time must be after start_search_time"));
    }

    let url = format!(
        "{}?start={}&end={}&players={}",
        course.action_url(action),
        start.to_rfc3339(),
        end.to_rfc3339(),
        num_players,
    );
    let mut req = RequestConfig::get(url).bearer(&token);
    req.timeout = Some(ctx.deadline.remaining());
    let resp = ctx.http.execute(req).await?;
    let parsed: TeeTimesResponse = resp.json()?;

    let mut tee_times = parsed.tee_times;
    tee_times.sort_by_key(|t| t.time);

    let lines: Vec<String> = tee_times
        .iter()
        .map(|t| format!("- {} ({} slot{} open)", t.time.format("%Y-%m-%d %H:%M"), t.available_slots, if t.available_slots == 1 { "" } else { "s" }))
        .collect();
    let mut chunks = vec![lines.join("\n")];

    if payload.auto_book {
        if let Some(earliest) = tee_times.first() {
            let booking_payload = WebActionPayload::builder("golf")
                .course_id(course.course_id)
                .auth_config(payload.auth_config.clone().unwrap_or_default())
                .argument("operation", serde_json::json!("book_tee_time"))
                .tee_sheet_id(earliest_tee_sheet_id(earliest))
                .build();
            let booked = book_tee_time(ctx, &booking_payload, course).await?;
            chunks.extend(booked);
        }
    }

    Ok(chunks)
}

fn earliest_tee_sheet_id(tee_time: &TeeTime) -> i64 {
    tee_time.time.timestamp()
}

#[derive(Debug, Deserialize)]
struct BookingResponse {
    confirmation_number: String,
    price: f64,
}

async fn book_tee_time(ctx: &HandlerContext, payload: &WebActionPayload, course: &Course) -> Result<Vec<String>, RezError> {
    let auth = payload.auth_config.as_ref().ok_or_else(|| RezError::validation("book_tee_time requires auth_config"))?;
    if !auth.requires_jwks_verification() {
        return Err(RezError::unauthorized("book_tee_time requires a JWKS-verified token (auth_config.jwks_url)"));
    }
    let tee_sheet_id = payload.tee_sheet_id.ok_or_else(|| RezError::validation("book_tee_time requires payload.tee_sheet_id"))?;

    let action = course.require_action("book_tee_time")?;
    let token = bearer_token(ctx, payload).await?;

    let body = serde_json::json!({ "tee_sheet_id": tee_sheet_id });
    let mut req = RequestConfig::post(course.action_url(action)).bearer(&token).json_body(&body)?;
    req.timeout = Some(ctx.deadline.remaining());
    let resp = ctx.http.execute(req).await?;
    let parsed: BookingResponse = resp.json()?;

    Ok(vec![format!("Booked — confirmation {} (${:.2})", parsed.confirmation_number, parsed.price)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_cancel::{CancellationToken, Deadline};
    use ra_catalog::Catalog;
    use ra_core::auth::AuthConfig;
    use ra_core::course::CourseAction;
    use ra_http::{Allowlist, HttpClient};
    use ra_oauth::OAuthClient;
    use ra_secrets::SecretsCache;
    use std::sync::Arc;
    use std::time::Duration;

    struct NoSecrets;

    #[async_trait::async_trait]
    impl ra_secrets::SecretStore for NoSecrets {
        async fn fetch(&self, _name: &str) -> Result<serde_json::Value, RezError> {
            Err(RezError::internal("no secrets in this test"))
        }
    }

    fn sample_course() -> Course {
        Course {
            course_id: 1,
            name: "pebble-beach".into(),
            origin: "https://pebble-beach.example.com".into(),
            client_id: "client-1".into(),
            website_id: "web-1".into(),
            scope: "reservations".into(),
            actions: vec![
                CourseAction { name: "fetch_reservations".into(), path: "/reservations".into(), method: "GET".into() },
                CourseAction { name: "search_tee_times".into(), path: "/search".into(), method: "GET".into() },
                CourseAction { name: "book_tee_time".into(), path: "/book".into(), method: "POST".into() },
            ],
        }
    }

    fn context() -> HandlerContext {
        let http = Arc::new(HttpClient::new(Allowlist::new(), ra_retry::RetryPolicy::default()).unwrap());
        let secrets = Arc::new(SecretsCache::new(Arc::new(NoSecrets)));
        let catalog = Catalog::from_courses(vec![sample_course()]).unwrap();
        HandlerContext {
            oauth: Arc::new(OAuthClient::new(http.clone(), secrets)),
            http,
            catalog: Arc::new(catalog),
            deadline: Deadline::from_now(Duration::from_secs(30)),
            cancel: CancellationToken::new(),
        }
    }

    // -- 1. unknown operation is rejected before any course/network work -----
    #[tokio::test]
    async fn unknown_operation_is_validation_error() {
        let ctx = context();
        let payload = WebActionPayload::builder("golf").course_id(1).argument("operation", serde_json::json!("delete_course")).build();
        let err = GolfHandler.execute(&ctx, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }

    // -- 2. missing course_id is rejected -------------------------------------
    #[tokio::test]
    async fn missing_course_id_is_validation_error() {
        let ctx = context();
        let payload = WebActionPayload::builder("golf").argument("operation", serde_json::json!("fetch_reservations")).build();
        let err = GolfHandler.execute(&ctx, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }

    // -- 3. unknown course_id is rejected --------------------------------------
    #[tokio::test]
    async fn unknown_course_id_is_validation_error() {
        let ctx = context();
        let payload = WebActionPayload::builder("golf").course_id(999).argument("operation", serde_json::json!("fetch_reservations")).build();
        let err = GolfHandler.execute(&ctx, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }

    // -- 4. book_tee_time without a jwks url is a permanent unauthorized error (spec §4.9) --
    #[tokio::test]
    async fn booking_without_jwks_is_rejected() {
        let ctx = context();
        let course = sample_course();
        let payload = WebActionPayload::builder("golf")
            .course_id(1)
            .auth_config(AuthConfig::oauth_password("https://t", "s"))
            .argument("operation", serde_json::json!("book_tee_time"))
            .tee_sheet_id(42)
            .build();
        let err = book_tee_time(&ctx, &payload, &course).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Unauthorized);
    }

    // -- 5. out-of-range num_players is a permanent validation error (spec §4.9) --
    #[tokio::test]
    async fn out_of_range_num_players_is_validation_error() {
        let ctx = context();
        let course = sample_course();
        let payload = WebActionPayload::builder("golf")
            .course_id(1)
            .auth_config(AuthConfig::oauth_password("https://t", "s"))
            .search_window(Utc::now(), Utc::now() + chrono::Duration::hours(2))
            .num_players(9)
            .build();
        let err = search_tee_times(&ctx, &payload, &course).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }

    // -- 6. an empty search window is a permanent validation error -------------
    #[tokio::test]
    async fn inverted_search_window_is_validation_error() {
        let ctx = context();
        let course = sample_course();
        let payload = WebActionPayload::builder("golf")
            .course_id(1)
            .auth_config(AuthConfig::oauth_password("https://t", "s"))
            .search_window(Utc::now(), Utc::now() - chrono::Duration::hours(1))
            .num_players(2)
            .build();
        let err = search_tee_times(&ctx, &payload, &course).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }

    // -- 7. day_prefix labels today and tomorrow, nothing further out ----------
    #[test]
    fn day_prefix_labels_today_and_tomorrow() {
        let now = Utc::now();
        assert_eq!(day_prefix(now, now), "TODAY ");
        assert_eq!(day_prefix(now, now + chrono::Duration::days(1)), "TOMORROW ");
        assert_eq!(day_prefix(now, now + chrono::Duration::days(5)), "");
    }

    // -- 8. a course without a declared action is rejected ----------------------
    #[tokio::test]
    async fn undeclared_action_is_rejected() {
        let ctx = context();
        let mut course = sample_course();
        course.actions.clear();
        let payload = WebActionPayload::builder("golf")
            .course_id(1)
            .auth_config(AuthConfig::oauth_password("https://t", "s"))
            .build();
        let err = fetch_reservations(&ctx, &payload, &course).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }
}
