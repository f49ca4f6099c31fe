//! Already-parsed per-ingress routing policy.
//!
//! Annotation *parsing* (turning a map of string annotations into this
//! record) is an external concern; this crate only consumes the structured
//! result, the same way the model builder consumes already-decoded
//! services and endpoints.

use serde::{Deserialize, Serialize};

/// Canary traffic-shaping configuration carried by a shadow ingress.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Canary {
    pub enabled: bool,
    pub weight: u32,
    pub header: Option<String>,
    pub header_value: Option<String>,
    pub cookie: Option<String>,
}

/// The subset of [`Canary`] the upstream actually carries once attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TrafficShapingPolicy {
    pub weight: u32,
    pub header: Option<String>,
    pub cookie: Option<String>,
}

impl From<&Canary> for TrafficShapingPolicy {
    fn from(c: &Canary) -> Self {
        Self {
            weight: c.weight,
            header: c.header.clone(),
            cookie: c.cookie.clone(),
        }
    }
}

/// Redirect-related annotations.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Redirect {
    pub from_to_www: bool,
}

/// Structured routing policy for one ingress, as produced by the (external)
/// annotation parser. Fields not relevant to model building (auth, CORS,
/// rewrite targets, rate limits, ...) are carried opaquely so the template
/// layer can consume them without this crate understanding their semantics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AnnotationsRecord {
    /// Route directly to the service's cluster IP instead of expanding endpoints.
    pub service_upstream: bool,
    /// Per-location override of the default backend, used by the
    /// zero-endpoint pruning step to synthesize `custom-default-backend-*`.
    pub custom_default_backend: Option<String>,
    /// Cookie-based session affinity.
    pub session_affinity_cookie_name: Option<String>,
    pub session_affinity_cookie_hash: Option<String>,
    /// Canary configuration, if this ingress is a canary.
    pub canary: Canary,
    /// Redirect behavior.
    pub redirect: Redirect,
    /// Server alias hostnames.
    pub alias: Option<String>,
    /// Raw nginx server-block snippet.
    pub server_snippet: Option<String>,
    /// SSL cipher suite override.
    pub ssl_ciphers: Option<String>,
    /// `namespace/name` of a secret supplying a CA bundle for mutual TLS.
    pub auth_tls_secret: Option<String>,
    /// Error page/code used when mutual TLS verification fails.
    pub auth_tls_error_page: Option<String>,
    /// Forward this server's TLS connections at L4 without termination.
    pub ssl_passthrough: bool,
    /// Load-balancing algorithm for the upstream this location routes to.
    pub load_balancing: Option<String>,
    /// Consistent-hash key expression, when load balancing is hash-based.
    pub upstream_hash_by: Option<String>,
    /// `namespace/name` of a secret supplying a client cert for upstream mTLS.
    pub secure_ca_cert: Option<String>,
    /// Opaque pass-through fields the template layer interprets (rewrite
    /// targets, CORS policy, rate limits, auth, proxy timeouts, ...).
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
