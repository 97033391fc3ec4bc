//! In-memory [`KvStore`] reference implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use ra_error::RezError;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{KvStore, UpdateFn};

struct Record {
    value: Value,
    expires_at: Option<i64>,
}

impl Record {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// A `tokio::sync::RwLock`-protected in-memory store (spec §4.5: "ships
/// with an in-memory reference implementation... used by unit/integration
/// tests and suitable as a local/dev backend").
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, HashMap<String, Record>>>,
}

impl MemoryStore {
    /// Build an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn purge_expired(table: &mut HashMap<String, Record>, now: i64) {
    table.retain(|_, record| !record.is_expired(now));
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, table: &str, key: &str) -> Result<Option<Value>, RezError> {
        let now = Utc::now().timestamp();
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|t| t.get(key))
            .filter(|r| !r.is_expired(now))
            .map(|r| r.value.clone()))
    }

    async fn put_with_ttl(
        &self,
        table: &str,
        key: &str,
        value: Value,
        ttl_unix_seconds: Option<i64>,
    ) -> Result<(), RezError> {
        let mut tables = self.tables.write().await;
        let t = tables.entry(table.to_string()).or_default();
        t.insert(key.to_string(), Record { value, expires_at: ttl_unix_seconds });
        Ok(())
    }

    async fn conditional_update(&self, table: &str, key: &str, update: UpdateFn) -> Result<Value, RezError> {
        let now = Utc::now().timestamp();
        let mut tables = self.tables.write().await;
        let t = tables.entry(table.to_string()).or_default();
        purge_expired(t, now);

        let current = t.get(key).filter(|r| !r.is_expired(now)).map(|r| r.value.clone());
        let existing_ttl = t.get(key).and_then(|r| r.expires_at);

        let new_value = update(current)?;
        t.insert(key.to_string(), Record { value: new_value.clone(), expires_at: existing_ttl });
        Ok(new_value)
    }

    async fn query_by_index(&self, table: &str, index_field: &str, index_value: &str) -> Result<Vec<Value>, RezError> {
        let now = Utc::now().timestamp();
        let tables = self.tables.read().await;
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(t.values()
            .filter(|r| !r.is_expired(now))
            .filter(|r| r.value.get(index_field).and_then(Value::as_str) == Some(index_value))
            .map(|r| r.value.clone())
            .collect())
    }
}
