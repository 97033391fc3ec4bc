// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Directive ingress API, MCP tool endpoint, and shared daemon state.
//!
//! `rez-agentd` hosts three things in one process: the HTTP ingress surface
//! below, the MCP JSON-RPC tool server (`POST /mcp`), and the queue-driven
//! [`ra_worker::Worker`] loop, which `main` spawns as a background task
//! against the same repositories and pub/sub bus this router publishes to.

pub mod secrets;

use std::sync::Arc;

use axum::extract::{Path as AxPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use ra_core::directive::{Directive, DirectiveKind};
use ra_core::result::ActionResult;
use ra_core::stage::Stage;
use ra_core::status::DirectiveStatus;
use ra_error::{ErrorKind, RezError};
use ra_jsonrpc::Dispatcher;
use ra_pubsub::{ConsumerLoop, Envelope, Publisher};
use ra_store::{DirectiveRepository, ResultRepository};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Shared daemon state, threaded through every route via [`State`].
pub struct AppState {
    pub directives: Arc<DirectiveRepository>,
    pub results: Arc<ResultRepository>,
    pub publisher: Arc<dyn Publisher>,
    pub consumer: Arc<dyn ConsumerLoop>,
    pub dispatcher: Arc<Dispatcher>,
    pub stage: Stage,
    pub web_actions_queue: String,
}

/// Uniform error envelope for every route (spec §4.1: "the ingress API
/// surfaces the same `RezError` classification it stores internally").
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: ErrorKind,
    message: String,
}

impl From<RezError> for ApiError {
    fn from(err: RezError) -> Self {
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Blocked => StatusCode::FORBIDDEN,
            ErrorKind::StoreConflict => StatusCode::CONFLICT,
            ErrorKind::UpstreamTransient | ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::UpstreamPermanent => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, kind: err.kind(), message: err.message().to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": { "kind": self.kind.code(), "message": self.message } }));
        (self.status, body).into_response()
    }
}

/// Build the Axum router with all daemon routes.
#[must_use]
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/directives", get(list_directives).post(create_directive))
        .route("/v1/directives/{id}", get(get_directive))
        .route("/v1/results", get(list_results))
        .route("/v1/dead-letters", get(dead_letters))
        .route("/mcp", post(mcp))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "stage": state.stage.as_str(),
        "time": Utc::now().to_rfc3339(),
    }))
}

/// Body accepted by `POST /v1/directives` (spec §4.1 ingress).
#[derive(Debug, Deserialize)]
struct CreateDirectiveRequest {
    kind: DirectiveKind,
    payload: serde_json::Value,
    #[serde(default)]
    stage: Option<Stage>,
}

async fn create_directive(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDirectiveRequest>,
) -> Result<Json<Directive>, ApiError> {
    let stage = req.stage.unwrap_or(state.stage);
    let directive = Directive::new(stage, req.kind, &req.payload)?;

    if req.kind.is_web_action() {
        directive.web_action_payload()?.validate()?;
    }

    state.directives.save(&directive).await?;
    state.directives.update_status(&directive.id, DirectiveStatus::Created, DirectiveStatus::Queued, None).await?;

    // Only web_action directives have a consumer in this core (spec §3: the
    // other kinds are accepted and carried through, not executed).
    if req.kind.is_web_action() {
        state.publisher.publish(&state.web_actions_queue, Envelope::for_directive(directive.id.clone(), stage)).await?;
    }

    info!(directive_id = %directive.id, kind = ?req.kind, "directive_created");

    let mut stored = directive;
    stored.status = DirectiveStatus::Queued;
    Ok(Json(stored))
}

async fn get_directive(State(state): State<Arc<AppState>>, AxPath(id): AxPath<String>) -> Result<Json<Directive>, ApiError> {
    state
        .directives
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::from(RezError::validation(format!("directive '{id}' not found"))))
}

#[derive(Debug, Deserialize)]
struct ListDirectivesQuery {
    stage: Option<Stage>,
    status: Option<DirectiveStatus>,
    limit: Option<usize>,
}

const DEFAULT_LIST_LIMIT: usize = 50;

async fn list_directives(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListDirectivesQuery>,
) -> Result<Json<Vec<Directive>>, ApiError> {
    let directives = state.directives.list(q.stage, q.status, q.limit.unwrap_or(DEFAULT_LIST_LIMIT)).await?;
    Ok(Json(directives))
}

#[derive(Debug, Deserialize)]
struct ResultsQuery {
    message_id: String,
}

async fn list_results(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ResultsQuery>,
) -> Result<Json<Vec<ActionResult>>, ApiError> {
    let results = state.results.get_by_message_id(&q.message_id).await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
struct DeadLetterQuery {
    queue: String,
}

async fn dead_letters(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DeadLetterQuery>,
) -> Result<Json<Vec<Envelope>>, ApiError> {
    let envelopes = state.consumer.dead_letters(&q.queue).await?;
    Ok(Json(envelopes))
}

async fn mcp(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    Json(state.dispatcher.handle(&body).await)
}
