//! Upstream pools of endpoints.

use crate::model::annotations::TrafficShapingPolicy;
use serde::{Deserialize, Serialize};

/// A single routable endpoint: an address and port pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

/// Session affinity configuration attached to an upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionAffinity {
    pub affinity_type: Option<String>,
    pub cookie_name: Option<String>,
    pub cookie_hash: Option<String>,
    /// Paths (host-scoped) this affinity cookie has been recorded against.
    pub locations: Vec<String>,
}

/// A named pool of endpoints the proxy load-balances across.
///
/// Unique by `name` (conventionally `"<namespace>-<service>-<port>"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Upstream {
    pub name: String,
    pub port: u16,
    pub endpoints: Vec<Endpoint>,
    pub load_balancing: Option<String>,
    pub upstream_hash_by: Option<String>,
    pub secure_ca_cert: Option<String>,
    pub session_affinity: SessionAffinity,
    /// Canary upstreams that have no standalone vhost set this; such an
    /// upstream must never be a location's primary backend.
    pub no_server: bool,
    pub traffic_shaping_policy: Option<TrafficShapingPolicy>,
    /// Names of upstreams this one may spill canary traffic into.
    pub alternative_backends: Vec<String>,
    /// Set once any server referencing this upstream is SSL-passthrough.
    pub ssl_passthrough: bool,
}

impl Upstream {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
            endpoints: Vec::new(),
            load_balancing: None,
            upstream_hash_by: None,
            secure_ca_cert: None,
            session_affinity: SessionAffinity::default(),
            no_server: false,
            traffic_shaping_policy: None,
            alternative_backends: Vec::new(),
            ssl_passthrough: false,
        }
    }

    /// Fills currently-empty fields from `other`, implementing the "first
    /// occurrence wins, later ones only patch holes" upstream-merge rule.
    pub fn fill_empty_from(&mut self, other: &Upstream) {
        if self.secure_ca_cert.is_none() {
            self.secure_ca_cert = other.secure_ca_cert.clone();
        }
        if self.upstream_hash_by.is_none() {
            self.upstream_hash_by = other.upstream_hash_by.clone();
        }
        if self.load_balancing.is_none() {
            self.load_balancing = other.load_balancing.clone();
        }
    }

    /// A deep clone under a new name, used to synthesize
    /// `custom-default-backend-<name>` upstreams.
    pub fn clone_as(&self, new_name: impl Into<String>) -> Upstream {
        let mut clone = self.clone();
        clone.name = new_name.into();
        clone
    }
}

/// A [`Backend`] and an [`Upstream`] are the same entity throughout this
/// crate; the alias matches the name the admin API and rendered
/// configuration use for it.
pub type Backend = Upstream;
