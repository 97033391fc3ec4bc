// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Directive and result repository (spec §4.5).
//!
//! [`KvStore`] is the narrow capability interface over whatever
//! production key-value store a deployment provides (DynamoDB, Redis, ...);
//! [`MemoryStore`] is an in-memory reference implementation suitable for
//! tests and local/dev use. [`DirectiveRepository`] and [`ResultRepository`]
//! layer the spec's two logical tables on top of any `KvStore`.

mod directives;
mod memory;
mod results;

pub use directives::DirectiveRepository;
pub use memory::MemoryStore;
pub use results::ResultRepository;

use std::sync::Arc;

use async_trait::async_trait;
use ra_error::RezError;
use serde_json::Value;

/// A closure applied to the current value of a key (or `None` if absent)
/// under the store's write lock, producing either the value to persist or
/// an error that aborts the update (e.g. [`RezError::store_conflict`]).
///
/// Boxed rather than generic so [`KvStore`] stays object-safe — callers
/// hold it as `Arc<dyn KvStore>`.
pub type UpdateFn = Box<dyn FnOnce(Option<Value>) -> Result<Value, RezError> + Send>;

/// Narrow capability interface over a backing key-value store (spec §4.5,
/// §9 "pub/sub and store as capability interfaces").
///
/// `table` namespaces keys (this core uses `"directives"` and `"results"`,
/// named by `ra-config`'s `directives_table`/`results_table`).
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the current value for `key`, or `None` if absent or expired.
    async fn get(&self, table: &str, key: &str) -> Result<Option<Value>, RezError>;

    /// Write `value` under `key`, with an optional absolute expiry (unix
    /// seconds). The store must not return the record via [`Self::get`] or
    /// [`Self::query_by_index`] once past `ttl_unix_seconds`.
    async fn put_with_ttl(
        &self,
        table: &str,
        key: &str,
        value: Value,
        ttl_unix_seconds: Option<i64>,
    ) -> Result<(), RezError>;

    /// Atomically read-modify-write `key`. `update` observes the value as
    /// of lock acquisition and either returns the new value to persist or
    /// an error that leaves the stored value untouched.
    ///
    /// # Errors
    /// Propagates whatever `update` returns, plus
    /// [`RezError::store_unavailable`] on backend failure.
    async fn conditional_update(&self, table: &str, key: &str, update: UpdateFn) -> Result<Value, RezError>;

    /// Scan `table` for all non-expired values whose `index_field` equals
    /// `index_value` (string comparison). Reference implementations may
    /// scan linearly; production stores are expected to back this with a
    /// secondary index.
    async fn query_by_index(&self, table: &str, index_field: &str, index_value: &str) -> Result<Vec<Value>, RezError>;
}

/// Build the pair of repositories this core needs over a shared store.
#[must_use]
pub fn repositories(
    store: Arc<dyn KvStore>,
    directives_table: impl Into<String>,
    results_table: impl Into<String>,
) -> (DirectiveRepository, ResultRepository) {
    (
        DirectiveRepository::new(store.clone(), directives_table),
        ResultRepository::new(store, results_table),
    )
}
