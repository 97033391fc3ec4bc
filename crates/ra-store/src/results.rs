//! Results table (spec §4.5): keyed by `action_id`, secondary-indexed by
//! `message_id`, idempotent on first success.

use std::sync::Arc;

use ra_core::result::{ActionResult, ResultStatus};
use ra_error::RezError;
use tracing::warn;

use crate::KvStore;

/// CRUD over the results table (spec §4.5).
pub struct ResultRepository {
    store: Arc<dyn KvStore>,
    table: String,
}

impl ResultRepository {
    /// Build a repository over `store`, namespaced to `table` (spec §6
    /// `results_table` configuration name).
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, table: impl Into<String>) -> Self {
        Self { store, table: table.into() }
    }

    /// Persist `result`, honoring its own `ttl`.
    ///
    /// Idempotent on `action_id`: if `message_id` already has a `success`
    /// result recorded, a second `success` is dropped (first-write-wins,
    /// spec §3/§4.5) and logged as a duplicate delivery rather than
    /// overwriting. `failed` results and the very first `success` are
    /// always written.
    ///
    /// # Errors
    /// Propagates store failures as [`RezError::store_unavailable`].
    pub async fn save(&self, result: &ActionResult) -> Result<(), RezError> {
        if result.status == ResultStatus::Success {
            let existing = self.get_by_message_id(&result.message_id).await?;
            if existing.iter().any(|r| r.status == ResultStatus::Success) {
                warn!(
                    message_id = %result.message_id,
                    action_id = %result.action_id,
                    "duplicate delivery: a success result already exists, dropping this one"
                );
                return Ok(());
            }
        }
        let value = serde_json::to_value(result)?;
        self.store.put_with_ttl(&self.table, &result.action_id, value, Some(result.ttl)).await
    }

    /// Fetch every non-expired result for `message_id` (at most one should
    /// ever be `success`; spec §8 invariant 6).
    ///
    /// # Errors
    /// Propagates store/deserialization failures.
    pub async fn get_by_message_id(&self, message_id: &str) -> Result<Vec<ActionResult>, RezError> {
        let values = self.store.query_by_index(&self.table, "message_id", message_id).await?;
        values.into_iter().map(|v| serde_json::from_value(v).map_err(RezError::from)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use ra_core::stage::Stage;

    fn repo() -> ResultRepository {
        ResultRepository::new(Arc::new(MemoryStore::new()), "results")
    }

    fn success(message_id: &str) -> ActionResult {
        ActionResult::success(message_id, "weather", "https://x", Stage::Dev, 200, "ok", None, 5, 3600).unwrap()
    }

    // -- 1. save then get_by_message_id round-trips -------------------------
    #[tokio::test]
    async fn save_then_lookup_round_trips() {
        let repo = repo();
        let r = success("m1");
        repo.save(&r).await.unwrap();
        let found = repo.get_by_message_id("m1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].action_id, r.action_id);
    }

    // -- 2. a second success for the same message_id is dropped (spec §8 invariant 6) --
    #[tokio::test]
    async fn second_success_is_dropped() {
        let repo = repo();
        repo.save(&success("m1")).await.unwrap();
        repo.save(&success("m1")).await.unwrap();
        let found = repo.get_by_message_id("m1").await.unwrap();
        assert_eq!(found.iter().filter(|r| r.status == ResultStatus::Success).count(), 1);
    }

    // -- 3. failed results are always written, even alongside a success -----
    #[tokio::test]
    async fn failed_results_are_never_dropped() {
        let repo = repo();
        let failed = ActionResult::failed("m1", "weather", "https://x", Stage::Dev, Some(500), "boom", 1, 3600).unwrap();
        repo.save(&failed).await.unwrap();
        repo.save(&success("m1")).await.unwrap();
        let found = repo.get_by_message_id("m1").await.unwrap();
        assert_eq!(found.len(), 2);
    }

    // -- 4. unrelated message_ids don't collide ------------------------------
    #[tokio::test]
    async fn lookup_is_scoped_to_message_id() {
        let repo = repo();
        repo.save(&success("m1")).await.unwrap();
        repo.save(&success("m2")).await.unwrap();
        assert_eq!(repo.get_by_message_id("m1").await.unwrap().len(), 1);
        assert_eq!(repo.get_by_message_id("m2").await.unwrap().len(), 1);
    }
}
