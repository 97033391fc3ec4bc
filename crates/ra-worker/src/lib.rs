// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The queue-driven web-action worker (spec §4.10): the pipeline core that
//! turns a delivered [`ra_pubsub::Envelope`] into a terminal directive
//! status and, on success, a new `notify` directive.
//!
//! Workers are stateless and horizontally parallel; [`Worker::run`] bounds
//! in-process concurrency with a semaphore sized by [`WorkerConfig::concurrency`].

use std::sync::Arc;
use std::time::Duration;

use ra_cancel::{CancellationToken, Deadline};
use ra_catalog::Catalog;
use ra_core::directive::{Directive, DirectiveKind};
use ra_core::payload::WebActionPayload;
use ra_core::result::ActionResult;
use ra_core::stage::Stage;
use ra_core::status::{DirectiveStatus, TransitionOutcome};
use ra_error::{ErrorKind, RezError};
use ra_handlers::{HandlerContext, HandlerRegistry};
use ra_http::HttpClient;
use ra_oauth::OAuthClient;
use ra_pubsub::{ConsumerLoop, Envelope, Publisher};
use ra_store::{DirectiveRepository, ResultRepository};
use ra_telemetry::{DirectiveMetrics, DirectiveOutcome, MetricsCollector};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default queue batch size and in-process worker concurrency (spec §4.10,
/// §6 `worker_concurrency`).
pub const DEFAULT_CONCURRENCY: usize = 10;

/// TTL applied to a successful web-action result (spec §4.10: "ttl = now +
/// 3 days"), absent a tighter per-action policy (spec §9 open question 5).
const SUCCESS_RESULT_TTL_SECONDS: i64 = ra_core::MAX_RESULT_TTL_SECONDS;

/// 24h TTL for PII-bearing golf results (spec §9 open question 5: "24 hours
/// is acceptable and arguably preferable for PII-bearing results").
const GOLF_RESULT_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Per-action result-retention policy (spec §9 open question 5: whether to
/// persist the raw upstream body at all, and for how long). Weather results
/// are public data and keep the spec-maximum 3-day TTL with the raw body
/// retained; golf results may carry player names/confirmation numbers and
/// get a tighter 24h TTL with the raw body dropped — only
/// `transformed_result` is persisted.
fn result_policy(action: &str) -> (bool, i64) {
    match action {
        "golf" => (false, GOLF_RESULT_TTL_SECONDS),
        _ => (true, SUCCESS_RESULT_TTL_SECONDS),
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Maximum envelopes processed concurrently in this process.
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { concurrency: DEFAULT_CONCURRENCY }
    }
}

/// What to do with a delivered envelope once processing finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvelopeOutcome {
    /// Processing reached a terminal or idempotent-skip state; acknowledge.
    Ack,
    /// A transient failure occurred; let the substrate redeliver.
    Nack,
}

/// Shared state for one worker process (spec §4.10).
pub struct Worker {
    directives: Arc<DirectiveRepository>,
    results: Arc<ResultRepository>,
    handlers: Arc<HandlerRegistry>,
    publisher: Arc<dyn Publisher>,
    http: Arc<HttpClient>,
    oauth: Arc<OAuthClient>,
    catalog: Arc<Catalog>,
    stage: Stage,
    config: WorkerConfig,
    shutdown: CancellationToken,
    metrics: Arc<MetricsCollector>,
}

impl Worker {
    /// Build a worker over the given repositories, handler registry,
    /// publisher (for the `notify` fan-out in step 8), and ambient
    /// HTTP/OAuth/catalog state handlers need.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directives: Arc<DirectiveRepository>,
        results: Arc<ResultRepository>,
        handlers: Arc<HandlerRegistry>,
        publisher: Arc<dyn Publisher>,
        http: Arc<HttpClient>,
        oauth: Arc<OAuthClient>,
        catalog: Arc<Catalog>,
        stage: Stage,
        config: WorkerConfig,
        shutdown: CancellationToken,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self { directives, results, handlers, publisher, http, oauth, catalog, stage, config, shutdown, metrics }
    }

    /// The collector this worker records directive-processing samples into.
    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Drive the consumer loop against `queue` until `shutdown` is
    /// signaled, bounding in-process concurrency to `config.concurrency`
    /// (spec §4.10: "Workers are stateless and horizontally parallel...
    /// bounded worker pool sized to the batch").
    ///
    /// # Errors
    /// Propagates [`RezError::store_unavailable`] if the consumer loop
    /// itself cannot be reached.
    pub async fn run(self: Arc<Self>, consumer: Arc<dyn ConsumerLoop>, queue: &str) -> Result<(), RezError> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        while !self.shutdown.is_cancelled() {
            let batch = consumer.receive_batch(queue, self.config.concurrency).await?;
            if batch.is_empty() {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {}
                    () = self.shutdown.cancelled() => break,
                }
                continue;
            }

            let mut handles = Vec::with_capacity(batch.len());
            for envelope in batch {
                let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
                let worker = self.clone();
                let consumer = consumer.clone();
                let queue = queue.to_string();
                handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = worker.process_envelope(&envelope).await;
                    let ack_result = match outcome {
                        EnvelopeOutcome::Ack => consumer.ack(&queue, &envelope.message_id).await,
                        EnvelopeOutcome::Nack => consumer.nack(&queue, envelope).await,
                    };
                    if let Err(err) = ack_result {
                        warn!(error = %err, "failed to ack/nack envelope");
                    }
                }));
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
        Ok(())
    }

    /// Execute the spec §4.10 eight-step algorithm for one envelope.
    async fn process_envelope(&self, envelope: &Envelope) -> EnvelopeOutcome {
        // Step 2: directive may have already expired out of the store.
        let directive = match self.directives.get(&envelope.message_id).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                debug!(message_id = %envelope.message_id, "directive not found, swallowing envelope");
                return EnvelopeOutcome::Ack;
            }
            Err(err) => {
                warn!(error = %err, "store error loading directive");
                return EnvelopeOutcome::Nack;
            }
        };

        // Step 3: only web_action directives are executed by this worker.
        if directive.kind != DirectiveKind::WebAction {
            debug!(message_id = %envelope.message_id, kind = ?directive.kind, "non-web_action directive, skipping");
            return EnvelopeOutcome::Ack;
        }

        // Step 4: claim the directive.
        match self.directives.update_status(&directive.id, DirectiveStatus::Queued, DirectiveStatus::Processing, None).await {
            Ok(TransitionOutcome::Applied) => {
                info!(directive_id = %directive.id, "directive_processing");
            }
            Ok(TransitionOutcome::NoopTerminal) => return EnvelopeOutcome::Ack,
            Err(err) if err.kind() == ErrorKind::StoreConflict => {
                debug!(message_id = %envelope.message_id, "lost claim race to another worker, skipping");
                return EnvelopeOutcome::Ack;
            }
            Err(err) => {
                warn!(error = %err, "store error claiming directive");
                return EnvelopeOutcome::Nack;
            }
        }

        self.execute_claimed(directive).await
    }

    async fn execute_claimed(&self, directive: Directive) -> EnvelopeOutcome {
        let started = Instant::now();

        // Step 5: parse the payload.
        let payload = match directive.web_action_payload().and_then(|p| {
            p.validate()?;
            Ok(p)
        }) {
            Ok(p) => p,
            // No payload parsed yet, so there is genuinely no action/url to report.
            Err(err) => return self.fail_terminally(&directive, &err, "unknown", "", started).await,
        };

        // Step 6: look up the handler.
        let Some(handler) = self.handlers.get_arc(&payload.action) else {
            let err = RezError::validation(format!("no handler registered for action '{}'", payload.action));
            return self.fail_terminally(&directive, &err, &payload.action, &payload.url, started).await;
        };

        // Step 7: invoke with a bounded deadline.
        let deadline = Deadline::for_handler(Duration::from_secs(5 * 60));
        let ctx = HandlerContext {
            http: self.http.clone(),
            oauth: self.oauth.clone(),
            catalog: self.catalog.clone(),
            deadline,
            cancel: self.shutdown.clone(),
        };

        match handler.execute(&ctx, &payload).await {
            Ok(chunks) => self.succeed(&directive, &payload, &chunks, started).await,
            Err(err) if err.retryable() => self.retry_transiently(&directive, &err, &payload.action, started).await,
            Err(err) => self.fail_terminally(&directive, &err, &payload.action, &payload.url, started).await,
        }
    }

    async fn fail_terminally(&self, directive: &Directive, err: &RezError, action: &str, url: &str, started: Instant) -> EnvelopeOutcome {
        let result = ActionResult::failed(directive.id.as_str(), action, url, self.stage, None, err.message(), 0, 3600);
        if let Ok(result) = result {
            if let Err(store_err) = self.results.save(&result).await {
                warn!(error = %store_err, "failed to persist failed result");
            }
        }
        match self.directives.update_status(&directive.id, DirectiveStatus::Processing, DirectiveStatus::Failed, Some(err.message().to_string())).await
        {
            Ok(_) => warn!(directive_id = %directive.id, error = %err, "directive_failed"),
            Err(store_err) => warn!(error = %store_err, "failed to transition directive to failed"),
        }
        self.metrics.record(DirectiveMetrics {
            action: action.to_string(),
            stage: self.stage.to_string(),
            outcome: DirectiveOutcome::Failed,
            duration_ms: started.elapsed().as_millis() as u64,
            retry_count: directive.retry_count,
        });
        EnvelopeOutcome::Ack
    }

    async fn retry_transiently(&self, directive: &Directive, err: &RezError, action: &str, started: Instant) -> EnvelopeOutcome {
        if let Err(store_err) =
            self.directives.update_status(&directive.id, DirectiveStatus::Processing, DirectiveStatus::Queued, Some(err.message().to_string())).await
        {
            warn!(error = %store_err, "failed to transition directive back to queued for retry");
        }
        self.metrics.record(DirectiveMetrics {
            action: action.to_string(),
            stage: self.stage.to_string(),
            outcome: DirectiveOutcome::Retried,
            duration_ms: started.elapsed().as_millis() as u64,
            retry_count: directive.retry_count,
        });
        EnvelopeOutcome::Nack
    }

    async fn succeed(&self, directive: &Directive, payload: &WebActionPayload, chunks: &[String], started: Instant) -> EnvelopeOutcome {
        let transformed = chunks.first().cloned().unwrap_or_default();
        let (retain_raw_body, ttl_seconds) = result_policy(&payload.action);
        let response_body = if retain_raw_body && !chunks.is_empty() { Some(chunks.join("\n\n")) } else { None };

        let result = match ActionResult::success(
            directive.id.as_str(),
            payload.action.as_str(),
            payload.url.as_str(),
            self.stage,
            200,
            transformed.clone(),
            response_body,
            0,
            ttl_seconds,
        ) {
            Ok(r) => r,
            Err(err) => return self.fail_terminally(directive, &err, &payload.action, &payload.url, started).await,
        };

        if let Err(err) = self.results.save(&result).await {
            warn!(error = %err, "failed to persist success result");
            return EnvelopeOutcome::Nack;
        }

        if let Err(err) = self.directives.update_status(&directive.id, DirectiveStatus::Processing, DirectiveStatus::Completed, None).await {
            warn!(error = %err, "failed to transition directive to completed");
        }

        self.metrics.record(DirectiveMetrics {
            action: payload.action.clone(),
            stage: self.stage.to_string(),
            outcome: DirectiveOutcome::Completed,
            duration_ms: started.elapsed().as_millis() as u64,
            retry_count: directive.retry_count,
        });

        let notify = Directive::new_opaque(self.stage, DirectiveKind::Notify, transformed);
        if let Err(err) = self.directives.save(&notify).await {
            warn!(error = %err, "failed to persist notify directive");
            return EnvelopeOutcome::Ack;
        }
        if let Err(err) = self.publisher.publish("notifications", Envelope::for_directive(notify.id.clone(), self.stage)).await {
            warn!(error = %err, "failed to publish notify directive");
        }

        info!(directive_id = %directive.id, "directive_completed");
        EnvelopeOutcome::Ack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ra_catalog::Catalog;
    use ra_core::directive::DirectiveKind;
    use ra_core::status::DirectiveStatus;
    use ra_error::RezError;
    use ra_handlers::ActionHandler;
    use ra_pubsub::InMemoryBus;
    use ra_secrets::SecretsCache;
    use ra_store::MemoryStore;

    struct NoSecrets;

    #[async_trait]
    impl ra_secrets::SecretStore for NoSecrets {
        async fn fetch(&self, _name: &str) -> Result<serde_json::Value, RezError> {
            Err(RezError::internal("no secrets in this test"))
        }
    }

    struct AlwaysOk;

    #[async_trait]
    impl ActionHandler for AlwaysOk {
        async fn execute(&self, _ctx: &HandlerContext, _payload: &WebActionPayload) -> Result<Vec<String>, RezError> {
            Ok(vec!["done".to_string()])
        }
    }

    struct AlwaysTransient;

    #[async_trait]
    impl ActionHandler for AlwaysTransient {
        async fn execute(&self, _ctx: &HandlerContext, _payload: &WebActionPayload) -> Result<Vec<String>, RezError> {
            Err(RezError::upstream_transient("simulated upstream outage"))
        }
    }

    struct AlwaysPermanent;

    #[async_trait]
    impl ActionHandler for AlwaysPermanent {
        async fn execute(&self, _ctx: &HandlerContext, _payload: &WebActionPayload) -> Result<Vec<String>, RezError> {
            Err(RezError::upstream_permanent("simulated 404"))
        }
    }

    fn worker(handler: impl ActionHandler + 'static) -> (Arc<Worker>, Arc<DirectiveRepository>) {
        let store = Arc::new(MemoryStore::new());
        let directives = Arc::new(DirectiveRepository::new(store.clone(), "directives"));
        let results = Arc::new(ResultRepository::new(store, "results"));
        let mut registry = HandlerRegistry::new();
        registry.register("test_action", handler);
        let http = Arc::new(HttpClient::new(ra_http::Allowlist::new(), ra_retry::RetryPolicy::default()).unwrap());
        let secrets = Arc::new(SecretsCache::new(Arc::new(NoSecrets)));
        let oauth = Arc::new(OAuthClient::new(http.clone(), secrets));
        let worker = Arc::new(Worker::new(
            directives.clone(),
            results,
            Arc::new(registry),
            Arc::new(InMemoryBus::new()),
            http,
            oauth,
            Arc::new(Catalog::default()),
            Stage::Dev,
            WorkerConfig::default(),
            CancellationToken::new(),
            Arc::new(ra_telemetry::MetricsCollector::new()),
        ));
        (worker, directives)
    }

    async fn queued_directive(directives: &DirectiveRepository) -> Directive {
        let payload = WebActionPayload::builder("test_action").url("https://x").build();
        let mut d = Directive::new(Stage::Dev, DirectiveKind::WebAction, &payload).unwrap();
        d.status = DirectiveStatus::Queued;
        directives.save(&d).await.unwrap();
        d
    }

    // -- 1. an envelope for a missing directive is swallowed (ack) -----------
    #[tokio::test]
    async fn missing_directive_is_acked() {
        let (worker, _) = worker(AlwaysOk);
        let envelope = Envelope::for_directive("nonexistent", Stage::Dev);
        assert_eq!(worker.process_envelope(&envelope).await, EnvelopeOutcome::Ack);
    }

    // -- 2. a non-web_action directive is skipped (ack) -----------------------
    #[tokio::test]
    async fn non_web_action_directive_is_skipped() {
        let (worker, directives) = worker(AlwaysOk);
        let d = Directive::new_opaque(Stage::Dev, DirectiveKind::Hello, "hi");
        directives.save(&d).await.unwrap();
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        assert_eq!(worker.process_envelope(&envelope).await, EnvelopeOutcome::Ack);
    }

    // -- 3. a successful handler completes the directive and is acked --------
    #[tokio::test]
    async fn successful_handler_completes_directive() {
        let (worker, directives) = worker(AlwaysOk);
        let d = queued_directive(&directives).await;
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        assert_eq!(worker.process_envelope(&envelope).await, EnvelopeOutcome::Ack);
        assert_eq!(directives.get(&d.id).await.unwrap().unwrap().status, DirectiveStatus::Completed);
    }

    // -- 4. a transient handler error requeues and nacks (spec §4.10 step 7) --
    #[tokio::test]
    async fn transient_error_requeues_and_nacks() {
        let (worker, directives) = worker(AlwaysTransient);
        let d = queued_directive(&directives).await;
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        assert_eq!(worker.process_envelope(&envelope).await, EnvelopeOutcome::Nack);
        let reloaded = directives.get(&d.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, DirectiveStatus::Queued);
        assert_eq!(reloaded.retry_count, 1);
    }

    // -- 5. a permanent handler error fails the directive and is acked -------
    #[tokio::test]
    async fn permanent_error_fails_directive() {
        let (worker, directives) = worker(AlwaysPermanent);
        let d = queued_directive(&directives).await;
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        assert_eq!(worker.process_envelope(&envelope).await, EnvelopeOutcome::Ack);
        assert_eq!(directives.get(&d.id).await.unwrap().unwrap().status, DirectiveStatus::Failed);
    }

    // -- 5b. a persisted failed result carries the real action/url, not "unknown" ---
    #[tokio::test]
    async fn permanent_error_persists_action_and_url_on_the_failed_result() {
        let (worker, directives, results) = worker_for_action("test_action", AlwaysPermanent);
        let d = queued_directive(&directives).await;
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        worker.process_envelope(&envelope).await;

        let saved = results.get_by_message_id(&d.id).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].action, "test_action");
        assert_eq!(saved[0].url, "https://x");
    }

    // -- 5c. an unknown action is also reported as "unknown" on the failed result --
    #[tokio::test]
    async fn unknown_action_persists_action_name_on_the_failed_result() {
        let (worker, directives, results) = worker_for_action("test_action", AlwaysOk);
        let payload = WebActionPayload::builder("no_such_action").url("https://y").build();
        let mut d = Directive::new(Stage::Dev, DirectiveKind::WebAction, &payload).unwrap();
        d.status = DirectiveStatus::Queued;
        directives.save(&d).await.unwrap();
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        worker.process_envelope(&envelope).await;

        let saved = results.get_by_message_id(&d.id).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].action, "no_such_action");
        assert_eq!(saved[0].url, "https://y");
    }

    // -- 6. a directive already completed is idempotently skipped (spec §8 invariant: at-least-once) --
    #[tokio::test]
    async fn already_completed_directive_is_idempotent() {
        let (worker, directives) = worker(AlwaysOk);
        let mut d = queued_directive(&directives).await;
        d.status = DirectiveStatus::Completed;
        directives.save(&d).await.unwrap();
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        assert_eq!(worker.process_envelope(&envelope).await, EnvelopeOutcome::Ack);
    }

    // -- 7. a completed directive records a metrics sample --------------------
    #[tokio::test]
    async fn completion_records_a_metrics_sample() {
        let (worker, directives) = worker(AlwaysOk);
        let d = queued_directive(&directives).await;
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        worker.process_envelope(&envelope).await;
        let summary = worker.metrics().summary();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.completed_count, 1);
    }

    // -- 8. success publishes a persisted notify directive (spec §4.10 step 8, S2) --
    #[tokio::test]
    async fn success_persists_a_retrievable_notify_directive() {
        let (worker, directives) = worker(AlwaysOk);
        let d = queued_directive(&directives).await;
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        worker.process_envelope(&envelope).await;

        let all_dev = directives.list(Some(Stage::Dev), None, 10).await.unwrap();
        let notify = all_dev.iter().find(|other| other.kind == DirectiveKind::Notify).expect("notify directive persisted");
        assert_eq!(notify.payload, "done");
    }

    fn worker_for_action(action: &str, handler: impl ActionHandler + 'static) -> (Arc<Worker>, Arc<DirectiveRepository>, Arc<ResultRepository>) {
        let store = Arc::new(MemoryStore::new());
        let directives = Arc::new(DirectiveRepository::new(store.clone(), "directives"));
        let results = Arc::new(ResultRepository::new(store, "results"));
        let mut registry = HandlerRegistry::new();
        registry.register(action, handler);
        let http = Arc::new(HttpClient::new(ra_http::Allowlist::new(), ra_retry::RetryPolicy::default()).unwrap());
        let secrets = Arc::new(SecretsCache::new(Arc::new(NoSecrets)));
        let oauth = Arc::new(OAuthClient::new(http.clone(), secrets));
        let worker = Arc::new(Worker::new(
            directives.clone(),
            results.clone(),
            Arc::new(registry),
            Arc::new(InMemoryBus::new()),
            http,
            oauth,
            Arc::new(Catalog::default()),
            Stage::Dev,
            WorkerConfig::default(),
            CancellationToken::new(),
            Arc::new(ra_telemetry::MetricsCollector::new()),
        ));
        (worker, directives, results)
    }

    // -- 9. golf results drop the raw body and use the 24h PII TTL (spec §9 open question 5) --
    #[tokio::test]
    async fn golf_result_policy_drops_body_and_shortens_ttl() {
        let (worker, directives, results) = worker_for_action("golf", AlwaysOk);
        let payload = WebActionPayload::builder("golf").url("https://x").build();
        let mut d = Directive::new(Stage::Dev, DirectiveKind::WebAction, &payload).unwrap();
        d.status = DirectiveStatus::Queued;
        directives.save(&d).await.unwrap();
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        worker.process_envelope(&envelope).await;

        let saved = results.get_by_message_id(&d.id).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].response_body.is_none());
        assert_eq!(saved[0].ttl - saved[0].executed_at.timestamp(), GOLF_RESULT_TTL_SECONDS);
    }

    // -- 10. weather results keep the raw body and the 3-day TTL ceiling -----
    #[tokio::test]
    async fn weather_result_policy_keeps_body_and_max_ttl() {
        let (worker, directives, results) = worker_for_action("weather", AlwaysOk);
        let payload = WebActionPayload::builder("weather").url("https://x").build();
        let mut d = Directive::new(Stage::Dev, DirectiveKind::WebAction, &payload).unwrap();
        d.status = DirectiveStatus::Queued;
        directives.save(&d).await.unwrap();
        let envelope = Envelope::for_directive(d.id.clone(), Stage::Dev);
        worker.process_envelope(&envelope).await;

        let saved = results.get_by_message_id(&d.id).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].response_body.as_deref(), Some("done"));
        assert_eq!(saved[0].ttl - saved[0].executed_at.timestamp(), SUCCESS_RESULT_TTL_SECONDS);
    }
}
