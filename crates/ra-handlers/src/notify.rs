//! `notify` action handler, backing the MCP `send_push_notification` tool.
//!
//! Unlike `weather`/`golf` this action has no queue-driven counterpart in
//! spec §4.7–4.9 — it exists so `tools/call send_push_notification` can
//! "construct a `WebActionPayload` and invoke the same handler the worker
//! uses" (spec §4.12) like every other tool, rather than special-casing one
//! tool outside the handler registry. `payload.url` carries the configured
//! `notifier_url`; the handler performs no further trust decision on it
//! beyond the allowlist the HTTP client enforces, matching `WeatherHandler`.

use ra_core::payload::WebActionPayload;
use ra_error::RezError;
use ra_http::RequestConfig;

use crate::{ActionHandler, HandlerContext};

/// POSTs `{message, title, priority}` to `payload.url` (the configured
/// `notifier_url`).
pub struct NotifyHandler;

#[async_trait::async_trait]
impl ActionHandler for NotifyHandler {
    async fn execute(&self, ctx: &HandlerContext, payload: &WebActionPayload) -> Result<Vec<String>, RezError> {
        if payload.url.is_empty() {
            return Err(RezError::validation("notify action requires payload.url (notifier_url)"));
        }
        let message = payload
            .argument_str("message")
            .ok_or_else(|| RezError::validation("notify action requires arguments.message"))?;
        let title = payload.argument_str("title");
        let priority = payload.argument_str("priority").unwrap_or("default");

        let body = serde_json::json!({
            "message": message,
            "title": title,
            "priority": priority,
        });
        let mut req = RequestConfig::post(&payload.url).json_body(&body)?;
        req.timeout = Some(ctx.deadline.remaining());
        ctx.http.execute(req).await?;

        Ok(vec![format!("Notification sent: {message}")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_cancel::{CancellationToken, Deadline};
    use ra_catalog::Catalog;
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

    fn context() -> HandlerContext {
        let http = Arc::new(HttpClient::new(Allowlist::new(), ra_retry::RetryPolicy::default()).unwrap());
        let secrets = Arc::new(SecretsCache::new(Arc::new(NoSecrets)));
        HandlerContext {
            oauth: Arc::new(OAuthClient::new(http.clone(), secrets)),
            http,
            catalog: Arc::new(Catalog::default()),
            deadline: Deadline::from_now(Duration::from_secs(30)),
            cancel: CancellationToken::new(),
        }
    }

    // -- 1. missing url is rejected before any network work ---------------
    #[tokio::test]
    async fn empty_url_is_validation_error() {
        let ctx = context();
        let payload = WebActionPayload::builder("notify")
            .argument("message", serde_json::json!("hello"))
            .build();
        let err = NotifyHandler.execute(&ctx, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }

    // -- 2. missing message is rejected -------------------------------------
    #[tokio::test]
    async fn missing_message_is_validation_error() {
        let ctx = context();
        let payload = WebActionPayload::builder("notify").url("https://notify.example.com/push").build();
        let err = NotifyHandler.execute(&ctx, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }
}
