// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! SSRF-hardened HTTP client (spec §4.2) — the single chokepoint for every
//! outbound request made by an action handler.
//!
//! Enforces a hostname allowlist, blocks requests whose resolved address is
//! private/reserved (including re-resolving on every connection attempt to
//! mitigate DNS rebinding), floors TLS at 1.2, caps redirects and response
//! size, and retries only the error classes spec §4.2 allows.

mod guard;
mod redact;
mod resolver;

pub use guard::{is_blocked_ip, Allowlist};
pub use redact::redact_headers;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ra_error::RezError;
use ra_retry::RetryPolicy;
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

/// Read at most 10 MiB of a response body (spec §4.2).
pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Default per-attempt timeout (spec §4.2, §6 `http_timeout_seconds`).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum redirects followed, each revalidated against the allowlist + IP
/// rules (spec §4.2).
pub const MAX_REDIRECTS: usize = 2;

/// One outbound request.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: String,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
    /// Per-attempt timeout override; defaults to [`DEFAULT_TIMEOUT`].
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    /// Start a `GET` request to `url`.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::GET, url: url.into(), headers: BTreeMap::new(), body: None, timeout: None }
    }

    /// Start a `POST` request to `url`.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self { method: Method::POST, url: url.into(), headers: BTreeMap::new(), body: None, timeout: None }
    }

    /// Attach a header, returning `self` for chaining.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach an `Authorization: Bearer <token>` header.
    #[must_use]
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// Attach a JSON body and `Content-Type: application/json`.
    ///
    /// # Errors
    /// Returns [`RezError::internal`] if `body` cannot be serialized.
    pub fn json_body<T: serde::Serialize>(mut self, body: &T) -> Result<Self, RezError> {
        let bytes = serde_json::to_vec(body).map_err(|e| RezError::internal(format!("request body encoding: {e}")))?;
        self.body = Some(bytes);
        Ok(self.header("Content-Type", "application/json"))
    }

    /// Attach a form-encoded body and `Content-Type: application/x-www-form-urlencoded`.
    #[must_use]
    pub fn form_body(mut self, fields: &[(&str, &str)]) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(fields).finish();
        self.body = Some(encoded.into_bytes());
        self.header("Content-Type", "application/x-www-form-urlencoded")
    }
}

/// Response from a successful (post-retry) request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lower-cased names.
    pub headers: BTreeMap<String, String>,
    /// Raw response body, at most [`MAX_RESPONSE_BYTES`].
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// `true` for a `2xx` status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    /// Returns [`RezError::validation`] on malformed JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, RezError> {
        serde_json::from_slice(&self.body).map_err(|e| RezError::validation(format!("malformed response json: {e}")))
    }
}

/// The SSRF-hardened HTTP client (spec §4.2).
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    allowlist: Arc<Allowlist>,
    retry_policy: RetryPolicy,
    default_timeout: Duration,
}

impl HttpClient {
    /// Build a client seeded with `allowlist` (spec: "seeded with at least
    /// `api.weather.gov` and each course origin").
    ///
    /// # Errors
    /// Returns [`RezError::internal`] if the underlying reqwest client
    /// cannot be constructed (e.g. TLS backend initialization failure).
    pub fn new(allowlist: Allowlist, retry_policy: RetryPolicy) -> Result<Self, RezError> {
        let allowlist = Arc::new(allowlist);
        let client = reqwest::Client::builder()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .redirect(reqwest::redirect::Policy::none()) // we re-validate and follow redirects manually
            .dns_resolver(Arc::new(resolver::SsrfResolver::new(allowlist.clone())))
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RezError::internal(format!("building http client: {e}")))?;
        Ok(Self { client, allowlist, retry_policy, default_timeout: DEFAULT_TIMEOUT })
    }

    /// Execute `req`, retrying transient failures per spec §4.2/§4.14 and
    /// following up to [`MAX_REDIRECTS`] redirects, each revalidated.
    ///
    /// # Errors
    /// - [`RezError::blocked`] — scheme/host/IP rejected structurally; never retried.
    /// - [`RezError::upstream_transient`] — exhausted retries on 5xx/429/timeout/transport.
    /// - [`RezError::upstream_permanent`] — non-2xx 4xx response (other than 429).
    /// - [`RezError::validation`] — response exceeded [`MAX_RESPONSE_BYTES`] (truncated).
    pub async fn execute(&self, req: RequestConfig) -> Result<HttpResponse, RezError> {
        let mut url = req.url.clone();
        let mut redirects_followed = 0usize;
        loop {
            guard::validate_url(&url, &self.allowlist)?;
            let attempt_result = self.execute_one(&req, &url).await;
            match attempt_result {
                Ok(Outcome::Response(resp)) => return Ok(resp),
                Ok(Outcome::Redirect(location)) => {
                    redirects_followed += 1;
                    if redirects_followed > MAX_REDIRECTS {
                        return Err(RezError::blocked(format!(
                            "exceeded max redirects ({MAX_REDIRECTS}) following {}",
                            req.url
                        )));
                    }
                    url = location;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn execute_one(&self, req: &RequestConfig, url: &str) -> Result<Outcome, RezError> {
        let timeout = req.timeout.unwrap_or(self.default_timeout);
        let mut attempt = 0u32;
        loop {
            match self.single_attempt(req, url, timeout).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.retryable() && self.retry_policy.should_retry(attempt) => {
                    let delay = self.retry_policy.compute_delay(attempt);
                    warn!(attempt, ?delay, url = redact::redact_url(url), "retrying transient http failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn single_attempt(&self, req: &RequestConfig, url: &str, timeout: Duration) -> Result<Outcome, RezError> {
        let mut builder = self.client.request(req.method.clone(), url).timeout(timeout);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        debug!(
            method = %req.method,
            url = redact::redact_url(url),
            headers = ?redact::redact_headers(&req.headers),
            "http request"
        );

        let response = builder.send().await.map_err(classify_transport_error)?;
        let status = response.status();

        if status.is_redirection() {
            if let Some(location) = response.headers().get(reqwest::header::LOCATION) {
                let location = location
                    .to_str()
                    .map_err(|_| RezError::blocked("redirect Location header is not valid UTF-8"))?;
                let resolved = resolve_redirect(url, location)?;
                return Ok(Outcome::Redirect(resolved));
            }
        }

        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_ascii_lowercase(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body = read_capped_body(response).await?;

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RezError::upstream_transient(format!("upstream {status} from {}", redact::redact_url(url))));
        }
        if status.is_client_error() {
            return Err(RezError::upstream_permanent(format!("upstream {status} from {}", redact::redact_url(url))));
        }

        Ok(Outcome::Response(HttpResponse { status: status.as_u16(), headers, body }))
    }
}

enum Outcome {
    Response(HttpResponse),
    Redirect(String),
}

fn resolve_redirect(base: &str, location: &str) -> Result<String, RezError> {
    let base_url = url::Url::parse(base).map_err(|e| RezError::blocked(format!("invalid base url: {e}")))?;
    base_url.join(location).map(|u| u.to_string()).map_err(|e| RezError::blocked(format!("invalid redirect target: {e}")))
}

async fn read_capped_body(response: reqwest::Response) -> Result<Vec<u8>, RezError> {
    use futures_core::Stream;
    use std::pin::Pin;

    let mut stream: Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>> = Box::pin(response.bytes_stream());
    let mut buf = Vec::new();
    while let Some(chunk) = futures::StreamExt::next(&mut stream).await {
        let chunk = chunk.map_err(classify_transport_error)?;
        if buf.len() + chunk.len() > MAX_RESPONSE_BYTES {
            return Err(RezError::validation(format!(
                "response body exceeded {MAX_RESPONSE_BYTES} bytes (truncated)"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

fn classify_transport_error(err: reqwest::Error) -> RezError {
    if err.is_timeout() {
        RezError::upstream_transient(format!("timeout: {err}"))
    } else if err.is_connect() || err.is_request() || err.is_body() {
        RezError::upstream_transient(format!("transport error: {err}"))
    } else {
        RezError::internal(format!("http error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. RequestConfig builders set the right method --------------------
    #[test]
    fn get_and_post_set_method() {
        assert_eq!(RequestConfig::get("https://x").method, Method::GET);
        assert_eq!(RequestConfig::post("https://x").method, Method::POST);
    }

    // -- 2. bearer() sets Authorization header ------------------------------
    #[test]
    fn bearer_sets_authorization_header() {
        let req = RequestConfig::get("https://x").bearer("abc.def.ghi");
        assert_eq!(req.headers.get("Authorization").unwrap(), "Bearer abc.def.ghi");
    }

    // -- 3. form_body encodes pairs and sets content-type -------------------
    #[test]
    fn form_body_encodes_pairs() {
        let req = RequestConfig::post("https://x").form_body(&[("grant_type", "password"), ("username", "a b")]);
        let body = String::from_utf8(req.body.unwrap()).unwrap();
        assert!(body.contains("grant_type=password"));
        assert!(body.contains("username=a+b"));
        assert_eq!(req.headers.get("Content-Type").unwrap(), "application/x-www-form-urlencoded");
    }

    // -- 4. HttpResponse::is_success is precise ------------------------------
    #[test]
    fn is_success_checks_2xx() {
        let ok = HttpResponse { status: 200, headers: BTreeMap::new(), body: vec![] };
        let bad = HttpResponse { status: 404, headers: BTreeMap::new(), body: vec![] };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }

    // -- 5. resolve_redirect joins relative and absolute locations -----------
    #[test]
    fn resolve_redirect_handles_relative_and_absolute() {
        assert_eq!(
            resolve_redirect("https://a.example/x/y", "/z").unwrap(),
            "https://a.example/z"
        );
        assert_eq!(
            resolve_redirect("https://a.example/x", "https://b.example/q").unwrap(),
            "https://b.example/q"
        );
    }
}
