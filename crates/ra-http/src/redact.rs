//! Header redaction for any logging path that touches a request (spec §4.2,
//! §8 invariant 3: "no log record emitted during that request's handling
//! contains the substring `<t>`").

use std::collections::BTreeMap;

/// Header names that are always replaced with `[REDACTED]`, plus any
/// header whose name contains `token`, `secret`, or `password`
/// (case-insensitive).
const SENSITIVE_EXACT: &[&str] = &["authorization", "cookie", "x-api-key"];
const SENSITIVE_SUBSTRINGS: &[&str] = &["token", "secret", "password"];

fn is_sensitive(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_EXACT.contains(&lower.as_str()) || SENSITIVE_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

/// Return a copy of `headers` with sensitive values replaced by
/// `[REDACTED]`, safe to pass to `tracing`.
#[must_use]
pub fn redact_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| {
            if is_sensitive(k) {
                (k.clone(), "[REDACTED]".to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

/// Strip userinfo (`user:pass@`) and any query string from a URL before it
/// is logged, since query strings sometimes carry API keys.
#[must_use]
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut u) => {
            let _ = u.set_username("");
            let _ = u.set_password(None);
            u.set_query(None);
            u.to_string()
        }
        Err(_) => "[unparseable url]".to_string(),
    }
}
