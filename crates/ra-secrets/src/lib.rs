// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Process-local, short-TTL cache over an external secret store (spec §4.3).
//!
//! `SecretStore` is the narrow capability interface over whatever secret
//! manager the deployment uses; `SecretsCache` adds a 5-minute-default TTL
//! cache in front of it, reader-concurrent / writer-exclusive. Cached
//! values and fetch errors never carry the secret payload into logs — only
//! the secret name.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ra_error::RezError;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Default cache TTL (spec §6 `secrets_cache_ttl_minutes`).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Narrow capability interface over an external secret store, keyed by an
/// opaque name (spec §4.3, §9 "capability interfaces").
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the raw JSON document stored under `name`.
    ///
    /// # Errors
    /// Returns [`RezError::store_unavailable`] on transport/throttling
    /// failure, or [`RezError::internal`] if the secret does not exist.
    async fn fetch(&self, name: &str) -> Result<serde_json::Value, RezError>;
}

/// Golf credential shape stored under a course's secret name (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GolfCredentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
    pub website_id: String,
}

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Reader-writer-disciplined cache in front of a [`SecretStore`].
pub struct SecretsCache {
    store: Arc<dyn SecretStore>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl SecretsCache {
    /// Build a cache with the default 5-minute TTL.
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self::with_ttl(store, DEFAULT_TTL)
    }

    /// Build a cache with an explicit TTL (spec §6 `secrets_cache_ttl_minutes`).
    #[must_use]
    pub fn with_ttl(store: Arc<dyn SecretStore>, ttl: Duration) -> Self {
        Self { store, ttl, entries: RwLock::new(HashMap::new()) }
    }

    /// Fetch the raw secret document for `name`, serving from cache when
    /// fresh. On miss, fetches, stores, and returns.
    ///
    /// # Errors
    /// Propagates the underlying [`SecretStore::fetch`] error, scrubbed to
    /// never include the fetched value; only `name` appears in the message.
    pub async fn get(&self, name: &str) -> Result<serde_json::Value, RezError> {
        {
            let cache = self.entries.read().await;
            if let Some(entry) = cache.get(name) {
                if entry.expires_at > Instant::now() {
                    debug!(secret = name, "secrets cache hit");
                    return Ok(entry.value.clone());
                }
            }
        }

        let fetched = self
            .store
            .fetch(name)
            .await
            .map_err(|e| RezError::new(e.kind(), format!("fetching secret '{name}': {}", e.kind().code())))?;

        let mut cache = self.entries.write().await;
        cache.insert(name.to_string(), CacheEntry { value: fetched.clone(), expires_at: Instant::now() + self.ttl });
        Ok(fetched)
    }

    /// Typed accessor for golf OAuth credentials (spec §4.3, §6 secret
    /// record schema).
    ///
    /// # Errors
    /// Returns [`RezError::validation`] if the cached/fetched document does
    /// not match the expected shape.
    pub async fn golf_credentials(&self, secret_name: &str) -> Result<GolfCredentials, RezError> {
        let raw = self.get(secret_name).await?;
        serde_json::from_value(raw)
            .map_err(|e| RezError::validation(format!("secret '{secret_name}' has unexpected shape: {e}")))
    }

    /// Drop a cached entry, e.g. after an OAuth 4xx rejection that implies
    /// the credentials themselves may have rotated.
    pub async fn invalidate(&self, name: &str) {
        self.entries.write().await.remove(name);
    }
}
