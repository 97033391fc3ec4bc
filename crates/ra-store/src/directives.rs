//! Directives table (spec §4.5, §3: "retained for 90 days by the store's own TTL").

use std::sync::{Arc, Mutex};

use chrono::Utc;
use ra_core::directive::Directive;
use ra_core::stage::Stage;
use ra_core::status::{check_transition, DirectiveStatus, TransitionOutcome};
use ra_error::RezError;

use crate::KvStore;

/// Directive records are retained for 90 days (spec §3).
const DIRECTIVE_RETENTION_SECONDS: i64 = 90 * 24 * 60 * 60;

/// CRUD over the directives table, keyed by `Directive::id` (spec §4.5).
pub struct DirectiveRepository {
    store: Arc<dyn KvStore>,
    table: String,
}

impl DirectiveRepository {
    /// Build a repository over `store`, namespaced to `table` (spec §6
    /// `directives_table` configuration name).
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, table: impl Into<String>) -> Self {
        Self { store, table: table.into() }
    }

    /// Persist `directive`, with a 90-day retention TTL from `created_at`.
    ///
    /// # Errors
    /// Propagates store failures as [`RezError::store_unavailable`].
    pub async fn save(&self, directive: &Directive) -> Result<(), RezError> {
        let ttl = directive.created_at.timestamp() + DIRECTIVE_RETENTION_SECONDS;
        let value = serde_json::to_value(directive)?;
        self.store.put_with_ttl(&self.table, &directive.id, value, Some(ttl)).await
    }

    /// Fetch a directive by id, or `None` if absent or past retention.
    ///
    /// # Errors
    /// Returns [`RezError::validation`] if the stored value does not
    /// deserialize as a [`Directive`].
    pub async fn get(&self, id: &str) -> Result<Option<Directive>, RezError> {
        match self.store.get(&self.table, id).await? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Apply a status transition with optimistic concurrency control: the
    /// write only lands if the directive's current status matches
    /// `expected_status` at the moment the store applies it.
    ///
    /// Returns [`TransitionOutcome::NoopTerminal`] without writing if the
    /// directive was already terminal (spec §4.13: a terminal directive
    /// silently no-ops supporting at-least-once delivery). Returns
    /// [`RezError::store_conflict`] if a concurrent writer already moved the
    /// directive to a different, non-terminal status (spec §4.13: "the
    /// losing worker treats the rejection as already being handled").
    ///
    /// # Errors
    /// - [`RezError::store_conflict`] — lost a concurrent claim race.
    /// - [`RezError::validation`] — `expected_status -> new_status` is not a
    ///   legal edge in §4.13.
    /// - [`RezError::internal`] — no directive exists under `id`.
    pub async fn update_status(
        &self,
        id: &str,
        expected_status: DirectiveStatus,
        new_status: DirectiveStatus,
        error_message: Option<String>,
    ) -> Result<TransitionOutcome, RezError> {
        let id_owned = id.to_string();
        let outcome: Arc<Mutex<TransitionOutcome>> = Arc::new(Mutex::new(TransitionOutcome::Applied));
        let outcome_for_closure = outcome.clone();

        self.store
            .conditional_update(
                &self.table,
                id,
                Box::new(move |current| {
                    let current = current
                        .ok_or_else(|| RezError::internal(format!("directive '{id_owned}' not found")))?;
                    let mut directive: Directive = serde_json::from_value(current)?;

                    if directive.status != expected_status {
                        if directive.status.is_terminal() {
                            *outcome_for_closure.lock().expect("lock poisoned") = TransitionOutcome::NoopTerminal;
                            return Ok(serde_json::to_value(&directive)?);
                        }
                        return Err(RezError::store_conflict(format!(
                            "directive '{}' expected status {expected_status:?} but found {:?}",
                            directive.id, directive.status
                        )));
                    }

                    match check_transition(expected_status, new_status)? {
                        TransitionOutcome::NoopTerminal => {
                            *outcome_for_closure.lock().expect("lock poisoned") = TransitionOutcome::NoopTerminal;
                        }
                        TransitionOutcome::Applied => {
                            let is_transient_retry =
                                expected_status == DirectiveStatus::Processing && new_status == DirectiveStatus::Queued;
                            directive.status = new_status;
                            directive.updated_at = Utc::now();
                            directive.error_message = error_message.clone();
                            if is_transient_retry {
                                directive.retry_count += 1;
                            }
                        }
                    }
                    Ok(serde_json::to_value(&directive)?)
                }),
            )
            .await?;

        let outcome = *outcome.lock().expect("lock poisoned");
        Ok(outcome)
    }

    /// List directives, optionally filtered by `stage` and `status`, capped
    /// at `limit` (spec §4.5). The in-memory reference scans per-stage;
    /// production stores back this with a real secondary index.
    ///
    /// # Errors
    /// Propagates store/deserialization failures.
    pub async fn list(
        &self,
        stage: Option<Stage>,
        status: Option<DirectiveStatus>,
        limit: usize,
    ) -> Result<Vec<Directive>, RezError> {
        let stages = match stage {
            Some(s) => vec![s],
            None => vec![Stage::Dev, Stage::Stage, Stage::Prod],
        };
        let mut out = Vec::new();
        'outer: for s in stages {
            let values = self.store.query_by_index(&self.table, "stage", s.as_str()).await?;
            for v in values {
                let directive: Directive = serde_json::from_value(v)?;
                if status.is_some_and(|want| directive.status != want) {
                    continue;
                }
                out.push(directive);
                if out.len() >= limit {
                    break 'outer;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use ra_core::directive::DirectiveKind;

    fn repo() -> DirectiveRepository {
        DirectiveRepository::new(Arc::new(MemoryStore::new()), "directives")
    }

    // -- 1. save then get round-trips the directive -------------------------
    #[tokio::test]
    async fn save_then_get_round_trips() {
        let repo = repo();
        let d = Directive::new_opaque(Stage::Dev, DirectiveKind::Hello, "hi");
        repo.save(&d).await.unwrap();
        let back = repo.get(&d.id).await.unwrap().unwrap();
        assert_eq!(back.id, d.id);
    }

    // -- 2. the legal created -> queued transition applies -------------------
    #[tokio::test]
    async fn legal_transition_applies() {
        let repo = repo();
        let d = Directive::new_opaque(Stage::Dev, DirectiveKind::WebAction, "{}");
        repo.save(&d).await.unwrap();
        let outcome = repo.update_status(&d.id, DirectiveStatus::Created, DirectiveStatus::Queued, None).await.unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);
        assert_eq!(repo.get(&d.id).await.unwrap().unwrap().status, DirectiveStatus::Queued);
    }

    // -- 3. a lost concurrent claim race is a store conflict -----------------
    #[tokio::test]
    async fn concurrent_claim_is_store_conflict() {
        let repo = repo();
        let mut d = Directive::new_opaque(Stage::Dev, DirectiveKind::WebAction, "{}");
        d.status = DirectiveStatus::Queued;
        repo.save(&d).await.unwrap();
        // First worker wins the claim.
        repo.update_status(&d.id, DirectiveStatus::Queued, DirectiveStatus::Processing, None).await.unwrap();
        // Second worker's stale expectation loses.
        let err = repo
            .update_status(&d.id, DirectiveStatus::Queued, DirectiveStatus::Processing, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::StoreConflict);
    }

    // -- 4. transitioning a terminal directive is a silent no-op ------------
    #[tokio::test]
    async fn terminal_directive_transition_is_noop() {
        let repo = repo();
        let mut d = Directive::new_opaque(Stage::Dev, DirectiveKind::WebAction, "{}");
        d.status = DirectiveStatus::Completed;
        repo.save(&d).await.unwrap();
        let outcome = repo
            .update_status(&d.id, DirectiveStatus::Processing, DirectiveStatus::Failed, Some("late retry".into()))
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::NoopTerminal);
        assert_eq!(repo.get(&d.id).await.unwrap().unwrap().status, DirectiveStatus::Completed);
    }

    // -- 5. processing -> queued increments retry_count ----------------------
    #[tokio::test]
    async fn transient_retry_increments_retry_count() {
        let repo = repo();
        let mut d = Directive::new_opaque(Stage::Dev, DirectiveKind::WebAction, "{}");
        d.status = DirectiveStatus::Processing;
        repo.save(&d).await.unwrap();
        repo.update_status(&d.id, DirectiveStatus::Processing, DirectiveStatus::Queued, None).await.unwrap();
        assert_eq!(repo.get(&d.id).await.unwrap().unwrap().retry_count, 1);
    }

    // -- 6. list filters by stage and status, honoring the limit -------------
    #[tokio::test]
    async fn list_filters_by_stage_and_status() {
        let repo = repo();
        for _ in 0..3 {
            repo.save(&Directive::new_opaque(Stage::Dev, DirectiveKind::Hello, "x")).await.unwrap();
        }
        let mut prod = Directive::new_opaque(Stage::Prod, DirectiveKind::Hello, "x");
        prod.status = DirectiveStatus::Completed;
        repo.save(&prod).await.unwrap();

        let dev = repo.list(Some(Stage::Dev), None, 10).await.unwrap();
        assert_eq!(dev.len(), 3);

        let completed = repo.list(None, Some(DirectiveStatus::Completed), 10).await.unwrap();
        assert_eq!(completed.len(), 1);

        let limited = repo.list(Some(Stage::Dev), None, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }
}
