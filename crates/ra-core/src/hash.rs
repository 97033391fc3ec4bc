//! Canonical JSON serialization and hashing helpers.
//!
//! Used wherever a stable cache key or audit digest is needed: the OAuth
//! token cache key (`hash(token_url ∥ secret_name ∥ scope)`) and the
//! optional `result_sha256` diagnostic field on [`crate::ActionResult`].

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::RaCoreError;

/// Serialize `value` with sorted object keys so the same logical value
/// always produces the same bytes, regardless of field declaration order.
///
/// # Errors
/// Returns an error if `value` cannot be serialized to `serde_json::Value`.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, RaCoreError> {
    let v = serde_json::to_value(value).map_err(RaCoreError::Json)?;
    let sorted = sort_value(v);
    serde_json::to_string(&sorted).map_err(RaCoreError::Json)
}

fn sort_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, serde_json::Value> =
                std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k, sort_value(v));
            }
            serde_json::to_value(sorted).unwrap_or(serde_json::Value::Null)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_value).collect())
        }
        other => other,
    }
}

/// Hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash the components of an OAuth token cache key.
///
/// Never include the fetched credential values here, only the config
/// identifiers that select which token is being looked up.
#[must_use]
pub fn token_cache_key(token_url: &str, secret_name: &str, scope: &str) -> String {
    sha256_hex(format!("{token_url}\u{1}{secret_name}\u{1}{scope}").as_bytes())
}
