// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! OAuth 2.0 Resource Owner Password Credentials client (spec §4.4).
//!
//! Caches access tokens keyed by `(token_url, secret_name, scope)`,
//! coalesces concurrent refreshes for the same key into a single outbound
//! request, and optionally verifies the returned token against a JWKS
//! endpoint when the action requires it (spec §4.9 `book_tee_time`).

mod jwks;

pub use jwks::{JwksCache, JWKS_CACHE_TTL, MIN_VALIDITY_MARGIN_SECONDS};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ra_core::auth::AuthConfig;
use ra_core::hash::token_cache_key;
use ra_error::RezError;
use ra_http::{HttpClient, RequestConfig};
use ra_secrets::SecretsCache;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// A cache-hit is only served if the token has at least this long left
/// before `absolute_expiry` (spec §4.4: "5-minute-before-expiry").
const MIN_REMAINING_SECONDS: i64 = 5 * 60;

/// Margin subtracted from the provider's `expires_in` before caching, so a
/// cached token is never handed out right at the edge of expiry.
const EXPIRY_SAFETY_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    #[allow(dead_code)]
    refresh_token: Option<String>,
}

/// A cached, already-verified access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer token string.
    pub access_token: String,
    /// When this cache entry should no longer be served (provider expiry
    /// minus [`EXPIRY_SAFETY_MARGIN_SECONDS`]).
    pub absolute_expiry: DateTime<Utc>,
}

impl AccessToken {
    fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.absolute_expiry - now).num_seconds()
    }
}

/// OAuth password-grant client with a token cache and single-flight
/// refresh coalescing.
pub struct OAuthClient {
    http: Arc<HttpClient>,
    secrets: Arc<SecretsCache>,
    jwks: JwksCache,
    cache: RwLock<HashMap<String, AccessToken>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OAuthClient {
    /// Build a client over the given HTTP client and secrets cache.
    #[must_use]
    pub fn new(http: Arc<HttpClient>, secrets: Arc<SecretsCache>) -> Self {
        Self {
            jwks: JwksCache::new(http.clone()),
            http,
            secrets,
            cache: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Obtain a valid bearer token for `auth_config`, refreshing if the
    /// cached token is stale or absent. Concurrent callers for the same
    /// `(token_url, secret_name, scope)` key share one outbound request.
    ///
    /// # Errors
    /// - [`RezError::validation`] if `auth_config` lacks `token_url`/`secret_name`.
    /// - [`RezError::unauthorized`] on a 4xx token response or failed JWKS verification.
    /// - Propagates [`RezError::upstream_transient`] from the underlying HTTP client.
    pub async fn get_token(&self, auth_config: &AuthConfig) -> Result<AccessToken, RezError> {
        let token_url =
            auth_config.token_url.as_deref().ok_or_else(|| RezError::validation("auth_config.token_url is required"))?;
        let secret_name = auth_config
            .secret_name
            .as_deref()
            .ok_or_else(|| RezError::validation("auth_config.secret_name is required"))?;
        let scope = auth_config.scope.as_deref().unwrap_or("");
        let key = token_cache_key(token_url, secret_name, scope);

        if let Some(token) = self.cached_fresh(&key).await {
            return Ok(token);
        }

        let per_key_lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let _guard = per_key_lock.lock().await;

        if let Some(token) = self.cached_fresh(&key).await {
            return Ok(token);
        }

        let result = self.refresh(auth_config, token_url, secret_name, scope).await;
        if result.is_err() {
            self.cache.write().await.remove(&key);
        }
        let token = result?;
        self.cache.write().await.insert(key, token.clone());
        Ok(token)
    }

    async fn cached_fresh(&self, key: &str) -> Option<AccessToken> {
        let cache = self.cache.read().await;
        let token = cache.get(key)?;
        if token.remaining_seconds(Utc::now()) > MIN_REMAINING_SECONDS {
            Some(token.clone())
        } else {
            None
        }
    }

    async fn refresh(
        &self,
        auth_config: &AuthConfig,
        token_url: &str,
        secret_name: &str,
        scope: &str,
    ) -> Result<AccessToken, RezError> {
        let creds = self.secrets.golf_credentials(secret_name).await?;

        let mut fields = vec![
            ("grant_type", "password"),
            ("username", creds.username.as_str()),
            ("password", creds.password.as_str()),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ];
        if !scope.is_empty() {
            fields.push(("scope", scope));
        }

        let req = RequestConfig::post(token_url).form_body(&fields);
        let resp = match self.http.execute(req).await {
            Ok(resp) => resp,
            Err(err) => {
                if matches!(err.kind(), ra_error::ErrorKind::UpstreamPermanent) {
                    self.secrets.invalidate(secret_name).await;
                    warn!(token_url = redact_token_url(token_url), secret_name, "oauth_authentication_failed");
                    return Err(RezError::unauthorized(format!("token request to '{}' rejected", redact_token_url(token_url))));
                }
                return Err(err);
            }
        };

        if resp.status != 200 {
            self.secrets.invalidate(secret_name).await;
            warn!(token_url = redact_token_url(token_url), secret_name, status = resp.status, "oauth_authentication_failed");
            return Err(RezError::unauthorized(format!("token endpoint returned status {}", resp.status)));
        }

        let parsed: TokenResponse = resp.json()?;
        validate_token_shape(&parsed)?;

        if auth_config.requires_jwks_verification() {
            let jwks_url = auth_config.jwks_url.as_deref().expect("checked by requires_jwks_verification");
            let claims: serde_json::Value = self.jwks.verify(jwks_url, &parsed.access_token).await?;
            let exp = claims.get("exp").and_then(serde_json::Value::as_i64).unwrap_or(0);
            let remaining = exp - Utc::now().timestamp();
            if remaining < MIN_VALIDITY_MARGIN_SECONDS {
                return Err(RezError::unauthorized("jwt is within the minimum validity margin of expiry"));
            }
        }

        info!(token_url = redact_token_url(token_url), secret_name, "oauth token refreshed");

        let safe_ttl = (parsed.expires_in - EXPIRY_SAFETY_MARGIN_SECONDS).max(0);
        Ok(AccessToken {
            access_token: parsed.access_token,
            absolute_expiry: Utc::now() + chrono::Duration::seconds(safe_ttl),
        })
    }
}

fn validate_token_shape(resp: &TokenResponse) -> Result<(), RezError> {
    if !resp.token_type.eq_ignore_ascii_case("bearer") {
        return Err(RezError::unauthorized(format!("unexpected token_type '{}'", resp.token_type)));
    }
    if resp.expires_in <= 0 {
        return Err(RezError::unauthorized("expires_in must be positive"));
    }
    if resp.access_token.splitn(3, '.').count() != 3 {
        return Err(RezError::unauthorized("access_token is not a three-segment jwt"));
    }
    Ok(())
}

fn redact_token_url(url: &str) -> String {
    url::Url::parse(url).map(|mut u| {
        u.set_query(None);
        let _ = u.set_username("");
        let _ = u.set_password(None);
        u.to_string()
    }).unwrap_or_else(|_| "[unparseable token url]".to_string())
}
