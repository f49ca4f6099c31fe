//! Equality-based diffing and the reload/dynamic-patch decision.

use crate::model::RoutingModel;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// What a reconciliation must do to bring the data plane in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// `new == old`: nothing to do.
    NoOp,
    /// Only endpoints (and, if dynamic certs are enabled, certificate
    /// bytes) changed; a dynamic patch over the admin HTTP endpoint
    /// suffices.
    DynamicOnly,
    /// Structural change; a full reload is required, followed by a
    /// dynamic patch to push the now-current endpoints/certificates.
    FullReload,
}

/// Deep-equality between two routing models.
///
/// An explicit function rather than a derived `PartialEq` blanket
/// comparison, so the dynamic/reload decision stays auditable: each
/// projection used by [`dynamic_enough`] is visibly a variant of this.
pub fn equal(a: &RoutingModel, b: &RoutingModel) -> bool {
    a.backends == b.backends && a.servers == b.servers && a.passthrough_backends == b.passthrough_backends
}

/// True if `old` and `new` differ only in backend endpoints and, when
/// `dynamic_certificates_enabled`, in certificate identity.
pub fn dynamic_enough(old: &RoutingModel, new: &RoutingModel, dynamic_certificates_enabled: bool) -> bool {
    let old_projected = project_for_dynamic_compare(old, dynamic_certificates_enabled);
    let new_projected = project_for_dynamic_compare(new, dynamic_certificates_enabled);
    old_projected == new_projected
}

/// Clones `model` with `Backends` zeroed out entirely and, optionally,
/// certificate identifiers stripped from servers.
///
/// Every field on a backend (endpoints, canary traffic-shaping policy,
/// alternative backends, session affinity) is pushed through the dynamic
/// patch endpoint regardless of which of those fields changed, so none of
/// them should influence whether a full reload is needed.
fn project_for_dynamic_compare(model: &RoutingModel, dynamic_certificates_enabled: bool) -> RoutingModel {
    let mut projected = model.clone();
    projected.backends.clear();
    if dynamic_certificates_enabled {
        for server in projected.servers.iter_mut() {
            if let Some(cert) = &server.ssl_cert {
                server.ssl_cert = Some(cert.with_dynamic_placeholder());
            }
        }
    }
    projected
}

/// Decides what action a reconciliation must take, given the currently
/// running model and the freshly built one.
pub fn decide(old: &RoutingModel, new: &RoutingModel, dynamic_certificates_enabled: bool) -> Decision {
    if equal(old, new) {
        return Decision::NoOp;
    }
    if dynamic_enough(old, new, dynamic_certificates_enabled) {
        return Decision::DynamicOnly;
    }
    Decision::FullReload
}

/// A stable structural hash of `model`, keyed by field rather than memory
/// layout, stamped into `ConfigurationChecksum` before templating.
pub fn configuration_checksum(model: &RoutingModel) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_backends(&model.backends, &mut hasher);
    hash_servers(&model.servers, &mut hasher);
    model.passthrough_backends.hash(&mut hasher);
    hasher.finish()
}

fn hash_backends(backends: &[crate::model::Backend], hasher: &mut DefaultHasher) {
    for backend in backends {
        backend.name.hash(hasher);
        backend.port.hash(hasher);
        backend.endpoints.hash(hasher);
        backend.no_server.hash(hasher);
        backend.alternative_backends.hash(hasher);
    }
}

fn hash_servers(servers: &[crate::model::Server], hasher: &mut DefaultHasher) {
    for server in servers {
        server.hostname.hash(hasher);
        server.ssl_passthrough.hash(hasher);
        for location in &server.locations {
            location.path.hash(hasher);
            location.backend.hash(hasher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::backend::Endpoint;
    use crate::model::{RoutingModel, Upstream};

    fn base_model() -> RoutingModel {
        let mut upstream = Upstream::new("default-svc-80", 80);
        upstream.endpoints = vec![Endpoint { address: "10.0.0.1".to_string(), port: 80 }];
        RoutingModel {
            backends: vec![upstream],
            servers: Vec::new(),
            passthrough_backends: Vec::new(),
            backend_config_checksum: 0,
            configuration_checksum: 0,
        }
    }

    #[test]
    fn identical_models_are_noop() {
        let model = base_model();
        assert_eq!(decide(&model, &model, true), Decision::NoOp);
    }

    #[test]
    fn endpoint_only_change_is_dynamic_only() {
        let old = base_model();
        let mut new = old.clone();
        new.backends[0].endpoints.push(Endpoint { address: "10.0.0.2".to_string(), port: 80 });
        assert_eq!(decide(&old, &new, true), Decision::DynamicOnly);
    }

    #[test]
    fn backend_list_change_alone_is_still_dynamic_only() {
        // Backends are zeroed out of the comparison entirely: every field on
        // one (endpoints, canary policy, and the set of backends itself) is
        // pushed dynamically regardless, so adding one with no location
        // referencing it must not force a reload.
        let old = base_model();
        let mut new = old.clone();
        new.backends.push(Upstream::new("another-80", 80));
        assert_eq!(decide(&old, &new, true), Decision::DynamicOnly);
    }

    #[test]
    fn server_structural_change_is_full_reload() {
        use crate::model::server::{Location, Server};

        let old = base_model();
        let mut new = old.clone();
        let mut server = Server::new("a.example.com");
        server.locations.push(Location::placeholder("default-svc-80", "ns/ing"));
        new.servers.push(server);

        assert_eq!(decide(&old, &new, true), Decision::FullReload);
    }

    #[test]
    fn certificate_only_change_is_dynamic_when_dc_enabled() {
        use crate::model::server::Server;
        use crate::model::cert::SslCert;
        use chrono::Utc;

        let mut old = base_model();
        let mut server = Server::new("a.example.com");
        server.ssl_cert = Some(SslCert {
            pem_file_name: "old.pem".to_string(),
            pem_sha: "old-sha".to_string(),
            pem_cert_key: "ns/secret".to_string(),
            expire_time: Utc::now() + chrono::Duration::days(10),
            hosts: vec!["a.example.com".to_string()],
        });
        old.servers.push(server.clone());

        let mut new = old.clone();
        new.servers[0].ssl_cert.as_mut().unwrap().pem_file_name = "new.pem".to_string();
        new.servers[0].ssl_cert.as_mut().unwrap().pem_sha = "new-sha".to_string();

        assert_eq!(decide(&old, &new, true), Decision::DynamicOnly);
        assert_eq!(decide(&old, &new, false), Decision::FullReload);
    }
}
