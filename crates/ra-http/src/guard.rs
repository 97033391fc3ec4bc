//! Scheme/hostname allowlist and private-IP blocking (spec §4.2, §8 invariants 1-2).

use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::{Ipv4Net, Ipv6Net};
use ra_error::RezError;
use tracing::warn;
use url::Url;

/// IPv4 ranges the HTTP client refuses to dial (spec §4.2).
fn blocked_ipv4_nets() -> [Ipv4Net; 8] {
    [
        "10.0.0.0/8".parse().unwrap(),
        "172.16.0.0/12".parse().unwrap(),
        "192.168.0.0/16".parse().unwrap(),
        "127.0.0.0/8".parse().unwrap(),
        "169.254.0.0/16".parse().unwrap(),
        "0.0.0.0/8".parse().unwrap(),
        "224.0.0.0/4".parse().unwrap(),
        "240.0.0.0/4".parse().unwrap(),
    ]
}

/// `true` if `ip` falls in any range spec §4.2 enumerates: RFC1918, RFC5735
/// loopback/link-local (including the cloud metadata address
/// `169.254.169.254`), unspecified, multicast, reserved, IPv6 loopback,
/// link-local, and unique-local (`fc00::/7`).
#[must_use]
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => blocked_ipv4_nets().iter().any(|net| net.contains(&v4)),
        IpAddr::V6(v6) => {
            if v6.is_loopback() || v6.is_unspecified() {
                return true;
            }
            let unique_local: Ipv6Net = "fc00::/7".parse().unwrap();
            let link_local: Ipv6Net = "fe80::/10".parse().unwrap();
            unique_local.contains(&v6) || link_local.contains(&v6)
        }
    }
}

/// The hostname allowlist and scheme policy (spec §4.2).
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    hosts: HashSet<String>,
    /// Permit `http://` targets. Spec: "may be permitted only for explicit
    /// test doubles" — leave `false` in production configuration.
    pub allow_http: bool,
}

impl Allowlist {
    /// An empty allowlist (blocks everything until hosts are added).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the allowlist, e.g. with `api.weather.gov` and each course origin.
    #[must_use]
    pub fn with_hosts(hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut set = HashSet::new();
        for h in hosts {
            set.insert(h.into());
        }
        Self { hosts: set, allow_http: false }
    }

    /// Add a single host, returning `self` for chaining.
    #[must_use]
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.hosts.insert(host.into());
        self
    }

    /// Permit `http://` (test doubles only).
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// `true` if `host` exactly matches an allowlisted entry.
    #[must_use]
    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }
}

/// Validate `url`'s scheme and hostname against `allowlist` (spec §4.2, §8
/// invariants 1-2). IP-literal and resolved-address validation happens at
/// connection time via the custom DNS resolver, since only that stage can
/// re-resolve immediately before dialing (mitigating DNS rebinding).
///
/// # Errors
/// Returns [`RezError::blocked`] for a disallowed scheme or an
/// unlisted hostname.
pub fn validate_url(raw: &str, allowlist: &Allowlist) -> Result<(), RezError> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            warn!(url = raw, reason = %e, "ssrf_blocked");
            return Err(RezError::blocked(format!("unparseable url: {e}")));
        }
    };

    match url.scheme() {
        "https" => {}
        "http" if allowlist.allow_http => {}
        other => {
            warn!(url = raw, scheme = other, "ssrf_blocked");
            return Err(RezError::blocked(format!("scheme '{other}' is not permitted")));
        }
    }

    let host = url.host_str().ok_or_else(|| RezError::blocked("url has no host"))?;
    if !allowlist.contains(host) {
        warn!(url = raw, host, "ssrf_blocked");
        return Err(RezError::blocked(format!("host '{host}' is not in the allowlist")));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_blocked_ip(ip) {
            warn!(url = raw, %ip, "ssrf_blocked");
            return Err(RezError::blocked(format!("ip literal '{ip}' is in a blocked range")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. private/reserved ranges are blocked (spec §8 invariant 1) ------
    #[test]
    fn blocks_private_and_reserved_ranges() {
        let blocked: &[&str] = &[
            "10.1.2.3",
            "172.16.0.5",
            "192.168.1.1",
            "127.0.0.1",
            "169.254.169.254",
            "0.0.0.0",
            "224.0.0.1",
            "240.0.0.1",
            "::1",
            "fe80::1",
            "fc00::1",
        ];
        for ip in blocked {
            assert!(is_blocked_ip(ip.parse().unwrap()), "{ip} should be blocked");
        }
    }

    #[test]
    fn allows_public_addresses() {
        assert!(!is_blocked_ip("8.8.8.8".parse().unwrap()));
        assert!(!is_blocked_ip("1.1.1.1".parse().unwrap()));
    }

    // -- 2. host must exactly match the allowlist (spec §8 invariant 2) ----
    #[test]
    fn unlisted_host_is_blocked() {
        let allowlist = Allowlist::with_hosts(["api.weather.gov"]);
        assert!(validate_url("https://evil.example/x", &allowlist).is_err());
    }

    #[test]
    fn listed_host_is_allowed() {
        let allowlist = Allowlist::with_hosts(["api.weather.gov"]);
        assert!(validate_url("https://api.weather.gov/forecast", &allowlist).is_ok());
    }

    // -- 3. scheme allowlist: https required unless allow_http is set -------
    #[test]
    fn http_scheme_blocked_by_default() {
        let allowlist = Allowlist::with_hosts(["api.weather.gov"]);
        assert!(validate_url("http://api.weather.gov/x", &allowlist).is_err());
    }

    #[test]
    fn http_scheme_allowed_for_test_doubles() {
        let allowlist = Allowlist::with_hosts(["localhost"]).with_allow_http(true);
        assert!(validate_url("http://localhost/x", &allowlist).is_ok());
    }

    // -- 4. an IP literal in the url is checked even if the host string matches -
    #[test]
    fn ip_literal_target_is_checked() {
        let allowlist = Allowlist::with_hosts(["169.254.169.254"]);
        assert!(validate_url("https://169.254.169.254/latest/meta-data/", &allowlist).is_err());
    }
}
