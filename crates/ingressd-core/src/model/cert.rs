//! TLS certificate references carried by the routing model.
//!
//! Certificate *material* loading and filesystem placement are external
//! concerns (see spec scope); this crate only carries the identifying
//! metadata needed for diffing and for resolving which certificate a host
//! should use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder substituted for `pem_file_name`/`pem_sha` in the model used
/// for templating when dynamic certificates are enabled, so certificate
/// rotation alone never forces a full reload.
pub const DYNAMIC_CERT_PLACEHOLDER: &str = "dynamic";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SslCert {
    pub pem_file_name: String,
    pub pem_sha: String,
    /// `namespace/name` of the secret this certificate came from, used by
    /// the dynamic patch pipeline to fetch PEM bytes out-of-band.
    pub pem_cert_key: String,
    pub expire_time: DateTime<Utc>,
    /// Subject alternative names (and CN, appended as a fallback entry).
    pub hosts: Vec<String>,
}

impl SslCert {
    /// Whether this certificate covers `host`, via SAN or CN.
    pub fn matches_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| host_matches(h, host))
    }

    /// Returns a clone with `pem_file_name`/`pem_sha` replaced by the
    /// dynamic-certificate placeholder, for use in diff/template contexts
    /// when dynamic certificates are enabled.
    pub fn with_dynamic_placeholder(&self) -> Self {
        Self {
            pem_file_name: DYNAMIC_CERT_PLACEHOLDER.to_string(),
            pem_sha: DYNAMIC_CERT_PLACEHOLDER.to_string(),
            ..self.clone()
        }
    }

    /// True if this certificate expires within the next `hours`.
    pub fn expires_within(&self, hours: i64, now: DateTime<Utc>) -> bool {
        self.expire_time - now < chrono::Duration::hours(hours)
    }
}

/// Matches a certificate SAN/CN entry (which may be a wildcard like
/// `*.example.com`) against a concrete hostname.
fn host_matches(pattern: &str, host: &str) -> bool {
    if pattern == host {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host
            .strip_suffix(suffix)
            .map(|prefix| prefix.ends_with('.') && prefix.len() > 1)
            .unwrap_or(false);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cert(hosts: Vec<&str>) -> SslCert {
        SslCert {
            pem_file_name: "cert.pem".to_string(),
            pem_sha: "abc123".to_string(),
            pem_cert_key: "ns/secret".to_string(),
            expire_time: Utc::now() + Duration::days(90),
            hosts: hosts.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn exact_host_matches() {
        assert!(cert(vec!["a.example.com"]).matches_host("a.example.com"));
    }

    #[test]
    fn wildcard_host_matches_direct_subdomain_only() {
        let c = cert(vec!["*.example.com"]);
        assert!(c.matches_host("a.example.com"));
        assert!(!c.matches_host("example.com"));
        assert!(!c.matches_host("a.b.example.com"));
    }

    #[test]
    fn non_matching_host_is_rejected() {
        assert!(!cert(vec!["a.example.com"]).matches_host("b.example.com"));
    }

    #[test]
    fn expiry_within_window_is_detected() {
        let mut c = cert(vec!["a.example.com"]);
        c.expire_time = Utc::now() + Duration::hours(100);
        assert!(c.expires_within(240, Utc::now()));
        assert!(!c.expires_within(10, Utc::now()));
    }

    #[test]
    fn dynamic_placeholder_replaces_identity_only() {
        let c = cert(vec!["a.example.com"]);
        let placeholder = c.with_dynamic_placeholder();
        assert_eq!(placeholder.pem_file_name, DYNAMIC_CERT_PLACEHOLDER);
        assert_eq!(placeholder.hosts, c.hosts);
    }
}
