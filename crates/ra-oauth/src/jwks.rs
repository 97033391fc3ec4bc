//! JWKS fetch/cache and JWT verification, used when `auth_config.jwks_url`
//! is set (spec §4.4: booking-capable actions require signature
//! verification, not just a well-formed token).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use ra_error::RezError;
use ra_http::{HttpClient, RequestConfig};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// JWKS documents are cached for an hour (spec §4.4).
pub const JWKS_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Tokens within this margin of expiry are rejected outright rather than
/// accepted and left to expire mid-use (spec §4.4).
pub const MIN_VALIDITY_MARGIN_SECONDS: i64 = 60;

struct CachedJwks {
    set: JwkSet,
    expires_at: Instant,
}

/// Cache of JWKS documents keyed by `jwks_url`.
pub struct JwksCache {
    http: Arc<HttpClient>,
    entries: RwLock<HashMap<String, CachedJwks>>,
}

impl JwksCache {
    /// Build an empty cache over `http`.
    #[must_use]
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http, entries: RwLock::new(HashMap::new()) }
    }

    async fn fetch(&self, jwks_url: &str) -> Result<JwkSet, RezError> {
        {
            let cache = self.entries.read().await;
            if let Some(entry) = cache.get(jwks_url) {
                if entry.expires_at > Instant::now() {
                    return Ok(entry.set.clone());
                }
            }
        }

        let resp = self.http.execute(RequestConfig::get(jwks_url)).await?;
        let set: JwkSet = resp.json()?;

        let mut cache = self.entries.write().await;
        cache.insert(jwks_url.to_string(), CachedJwks { set: set.clone(), expires_at: Instant::now() + JWKS_CACHE_TTL });
        Ok(set)
    }

    /// Verify `token` against the JWKS published at `jwks_url`, returning
    /// the decoded claims on success.
    ///
    /// # Errors
    /// Returns [`RezError::unauthorized`] on signature failure, unknown
    /// `kid`, unsupported key type, or `exp` within
    /// [`MIN_VALIDITY_MARGIN_SECONDS`] of now.
    pub async fn verify<T: DeserializeOwned>(&self, jwks_url: &str, token: &str) -> Result<T, RezError> {
        let header = decode_header(token).map_err(|e| RezError::unauthorized(format!("malformed jwt header: {e}")))?;
        let set = self.fetch(jwks_url).await?;

        let jwk = match &header.kid {
            Some(kid) => set.find(kid).ok_or_else(|| RezError::unauthorized(format!("jwks: unknown kid '{kid}'")))?,
            None => set.keys.first().ok_or_else(|| RezError::unauthorized("jwks: empty key set"))?,
        };

        let (decoding_key, algorithm) = match &jwk.algorithm {
            AlgorithmParameters::RSA(rsa) => {
                let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                    .map_err(|e| RezError::unauthorized(format!("jwks: invalid rsa key: {e}")))?;
                (key, header.alg)
            }
            AlgorithmParameters::EllipticCurve(ec) => {
                let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                    .map_err(|e| RezError::unauthorized(format!("jwks: invalid ec key: {e}")))?;
                (key, header.alg)
            }
            _ => return Err(RezError::unauthorized("jwks: unsupported key algorithm")),
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        if matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(RezError::unauthorized("jwks: symmetric algorithms are not accepted"));
        }

        let data = decode::<T>(token, &decoding_key, &validation)
            .map_err(|e| RezError::unauthorized(format!("jwt verification failed: {e}")))?;

        Ok(data.claims)
    }
}
