//! The model builder: a pure function from ingresses plus a store snapshot
//! to a fully-assembled [`RoutingModel`].
//!
//! Nothing in this module performs I/O; every external fact (services,
//! endpoints, secrets, annotations) is read once through the [`Store`]
//! trait up front, which keeps the whole pipeline unit-testable with
//! [`crate::model::store::InMemoryStore`] and deterministic given a fixed
//! input snapshot.

use crate::model::annotations::AnnotationsRecord;
use crate::model::backend::{Endpoint, Upstream};
use crate::model::cert::SslCert;
use crate::model::ingress::{Ingress, PortRef};
use crate::model::server::{Location, Server};
use crate::model::store::{Service, ServicePort, Store};
use crate::model::{RoutingModel, DEFAULT_BACKEND_NAME, DEFAULT_SERVER_HOST};
use ahash::AHashMap;
use chrono::Utc;
use log::warn;
use rand::seq::SliceRandom;

/// Default port used when no default service is configured.
const DEFAULT_BACKEND_PORT: u16 = 8181;

/// Builds a [`RoutingModel`] from the given ingress set and store snapshot.
///
/// `sort_backends` corresponds to `RuntimeConfig::sort_backends`:
/// deterministic ordering vs. shuffling endpoints so proxy-side round-robin
/// state is not biased by declaration order.
pub fn build_model(ingresses: &[Ingress], store: &dyn Store, sort_backends: bool) -> RoutingModel {
    let mut ingresses: Vec<&Ingress> = ingresses.iter().collect();
    ingresses.sort_by_key(|i| i.resource_version);

    let mut upstreams: AHashMap<String, Upstream> = AHashMap::new();
    let mut servers: AHashMap<String, Server> = AHashMap::new();

    upstreams.insert(
        DEFAULT_BACKEND_NAME.to_string(),
        default_upstream(store),
    );
    servers.insert(
        DEFAULT_SERVER_HOST.to_string(),
        default_server(store),
    );

    for ingress in &ingresses {
        process_ingress(ingress, store, sort_backends, &mut upstreams, &mut servers);
    }

    merge_canary_alternatives(&ingresses, store, &mut upstreams, &mut servers);
    resolve_certificates(store, &mut servers);
    clear_colliding_aliases(&mut servers);

    let (backends, servers) = prune_and_sort(upstreams, servers);

    let mut model = RoutingModel {
        backends,
        servers,
        passthrough_backends: Vec::new(),
        backend_config_checksum: 0,
        configuration_checksum: 0,
    };
    model.passthrough_backends = model
        .servers
        .iter()
        .filter(|s| s.ssl_passthrough)
        .filter_map(|s| s.locations.first().map(|l| l.backend.clone()))
        .filter(|b| !b.is_empty())
        .collect();
    model
}

fn default_upstream(store: &dyn Store) -> Upstream {
    let mut upstream = Upstream::new(DEFAULT_BACKEND_NAME, DEFAULT_BACKEND_PORT);
    match store.get_default_backend() {
        Some(key) => {
            if let Some(service) = store.get_service(&key) {
                upstream.endpoints = service
                    .cluster_ip
                    .map(|ip| vec![Endpoint { address: ip, port: DEFAULT_BACKEND_PORT }])
                    .unwrap_or_default();
            } else {
                warn!("default backend '{}' not found in store, serving 127.0.0.1 fallback", key);
                upstream.endpoints = vec![Endpoint { address: "127.0.0.1".to_string(), port: DEFAULT_BACKEND_PORT }];
            }
        }
        None => {
            upstream.endpoints = vec![Endpoint { address: "127.0.0.1".to_string(), port: DEFAULT_BACKEND_PORT }];
        }
    }
    upstream
}

fn default_server(_store: &dyn Store) -> Server {
    let mut server = Server::new(DEFAULT_SERVER_HOST);
    server.locations.push(Location::placeholder(DEFAULT_BACKEND_NAME, "_"));
    server
}

/// `"<namespace>-<service>-<port>"`, the upstream naming convention used
/// throughout the model.
fn upstream_name(namespace: &str, service: &str, port: &PortRef) -> String {
    let port_str = match port {
        PortRef::Number(n) => n.to_string(),
        PortRef::Name(name) => name.clone(),
    };
    format!("{}-{}-{}", namespace, service, port_str)
}

fn process_ingress(
    ingress: &Ingress,
    store: &dyn Store,
    sort_backends: bool,
    upstreams: &mut AHashMap<String, Upstream>,
    servers: &mut AHashMap<String, Server>,
) {
    let ingress_key = ingress.key();
    let annotations = store.get_ingress_annotations(&ingress_key);

    if let Some(default_backend) = &ingress.default_backend {
        let name = upstream_name(&ingress.namespace, &default_backend.service_name, &default_backend.service_port);
        build_upstream(
            &name,
            &ingress.namespace,
            &default_backend.service_name,
            &default_backend.service_port,
            store,
            sort_backends,
            &annotations,
            upstreams,
        );

        if ingress.is_catch_all() {
            if let Some(root) = servers.get_mut(DEFAULT_SERVER_HOST) {
                if let Some(loc) = root.find_location_mut("/") {
                    loc.backend = name;
                    loc.ingress_ref = ingress_key.clone();
                    loc.is_default_backend = false;
                    loc.annotations = catch_all_annotations(&annotations);
                }
            }
        }
    }

    for rule in &ingress.rules {
        let host = if rule.host.is_empty() { DEFAULT_SERVER_HOST.to_string() } else { rule.host.clone() };

        let server = servers.entry(host.clone()).or_insert_with(|| {
            let mut s = Server::new(host.clone());
            let default_backend_name = ingress
                .default_backend
                .as_ref()
                .map(|db| upstream_name(&ingress.namespace, &db.service_name, &db.service_port))
                .unwrap_or_else(|| DEFAULT_BACKEND_NAME.to_string());
            s.locations.push(Location::placeholder(default_backend_name, ingress_key.clone()));
            s
        });

        apply_server_fields(server, &annotations, &ingress_key);

        for path in &rule.paths {
            let backend_name = upstream_name(&ingress.namespace, &path.service_name, &path.service_port);
            build_upstream(
                &backend_name,
                &ingress.namespace,
                &path.service_name,
                &path.service_port,
                store,
                sort_backends,
                &annotations,
                upstreams,
            );
            assemble_location(server, &path.path, &backend_name, &path.service_name, &path.service_port, &ingress_key, &annotations, upstreams);

            if annotations.canary.enabled {
                if let Some(u) = upstreams.get_mut(&backend_name) {
                    u.no_server = true;
                    u.traffic_shaping_policy = Some((&annotations.canary).into());
                }
            }
        }
    }
}

fn catch_all_annotations(annotations: &AnnotationsRecord) -> AnnotationsRecord {
    let mut a = annotations.clone();
    a.redirect = Default::default();
    a
}

fn apply_server_fields(server: &mut Server, annotations: &AnnotationsRecord, ingress_key: &str) {
    if let Some(alias) = &annotations.alias {
        if server.alias.is_none() {
            server.alias = Some(alias.clone());
        } else {
            warn!("server '{}' already has an alias, ignoring duplicate from {}", server.hostname, ingress_key);
        }
    }
    if let Some(snippet) = &annotations.server_snippet {
        if server.server_snippet.is_none() {
            server.server_snippet = Some(snippet.clone());
        } else {
            warn!("server '{}' already has a server snippet, ignoring duplicate from {}", server.hostname, ingress_key);
        }
    }
    if let Some(ciphers) = &annotations.ssl_ciphers {
        if server.ssl_ciphers.is_none() {
            server.ssl_ciphers = Some(ciphers.clone());
        } else {
            warn!("server '{}' already has ssl_ciphers set, ignoring duplicate from {}", server.hostname, ingress_key);
        }
    }
    if let Some(ca) = &annotations.auth_tls_secret {
        if server.auth_tls_secret.is_none() {
            server.auth_tls_secret = Some(ca.clone());
        } else {
            warn!("server '{}' already has an auth TLS secret, ignoring duplicate from {}", server.hostname, ingress_key);
        }
    }
    if let Some(err_page) = &annotations.auth_tls_error_page {
        if server.auth_tls_error_page.is_none() {
            server.auth_tls_error_page = Some(err_page.clone());
        } else {
            warn!("server '{}' already has an auth TLS error page, ignoring duplicate from {}", server.hostname, ingress_key);
        }
    }
    if annotations.ssl_passthrough {
        server.ssl_passthrough = true;
    }
}

/// Clears any server alias that collides with another server's hostname.
fn clear_colliding_aliases(servers: &mut AHashMap<String, Server>) {
    let hostnames: Vec<String> = servers.keys().cloned().collect();
    for server in servers.values_mut() {
        if let Some(alias) = &server.alias {
            if hostnames.contains(alias) {
                warn!("server '{}' alias '{}' collides with an existing server hostname, clearing", server.hostname, alias);
                server.alias = None;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble_location(
    server: &mut Server,
    path: &str,
    backend_name: &str,
    service_name: &str,
    service_port: &PortRef,
    ingress_key: &str,
    annotations: &AnnotationsRecord,
    upstreams: &mut AHashMap<String, Upstream>,
) {
    let port_number = match service_port {
        PortRef::Number(n) => *n,
        PortRef::Name(_) => 0,
    };

    if let Some(existing) = server.find_location_mut(path) {
        if !existing.is_default_backend {
            // First writer wins; skip.
            return;
        }
        existing.backend = backend_name.to_string();
        existing.service = Some(service_name.to_string());
        existing.port = port_number;
        existing.is_default_backend = false;
        existing.ingress_ref = ingress_key.to_string();
        existing.annotations = annotations.clone();
    } else {
        server.locations.push(Location {
            path: path.to_string(),
            backend: backend_name.to_string(),
            service: Some(service_name.to_string()),
            port: port_number,
            is_default_backend: false,
            ingress_ref: ingress_key.to_string(),
            annotations: annotations.clone(),
        });
    }

    if annotations.redirect.from_to_www {
        server.redirect_from_to_www = true;
    }

    if let Some(cookie_name) = &annotations.session_affinity_cookie_name {
        if let Some(upstream) = upstreams.get_mut(backend_name) {
            if upstream.session_affinity.affinity_type.is_none() {
                upstream.session_affinity.affinity_type = Some("cookie".to_string());
                upstream.session_affinity.cookie_name = Some(cookie_name.clone());
                upstream.session_affinity.cookie_hash = annotations.session_affinity_cookie_hash.clone();
            }
            upstream.session_affinity.locations.push(format!("{}{}", server.hostname, path));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_upstream(
    name: &str,
    namespace: &str,
    service_name: &str,
    service_port: &PortRef,
    store: &dyn Store,
    sort_backends: bool,
    annotations: &AnnotationsRecord,
    upstreams: &mut AHashMap<String, Upstream>,
) {
    let mut upstream = Upstream::new(name, port_number_hint(service_port));
    upstream.load_balancing = annotations.load_balancing.clone();
    upstream.upstream_hash_by = annotations.upstream_hash_by.clone();
    upstream.secure_ca_cert = annotations.secure_ca_cert.clone();

    if let Some(existing) = upstreams.get_mut(name) {
        // First occurrence already resolved endpoints for this service/port;
        // later occurrences only patch holes in the annotation-derived fields.
        existing.fill_empty_from(&upstream);
        return;
    }

    let service_key = format!("{}/{}", namespace, service_name);

    let Some(service) = store.get_service(&service_key) else {
        warn!("service '{}' not found in store; upstream '{}' will have no endpoints", service_key, name);
        upstreams.insert(name.to_string(), upstream);
        return;
    };

    if let Some(external) = &service.external_name {
        upstream.endpoints = resolve_external_name(external, service_port);
        upstreams.insert(name.to_string(), upstream);
        return;
    }

    if annotations.service_upstream {
        if let Some(ip) = &service.cluster_ip {
            let port = service
                .port_by_ref(service_port)
                .map(|p| p.number)
                .unwrap_or(upstream.port);
            upstream.port = port;
            upstream.endpoints = vec![Endpoint { address: ip.clone(), port }];
        }
        upstreams.insert(name.to_string(), upstream);
        return;
    }

    if let Some(port) = service.port_by_ref(service_port) {
        upstream.port = port.number;
        let mut endpoints = store
            .get_service_endpoints(&service_key, port)
            .map(|e| {
                e.addresses
                    .into_iter()
                    .map(|addr| Endpoint { address: addr, port: port.number })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        order_endpoints(&mut endpoints, sort_backends);
        upstream.endpoints = endpoints;
    } else {
        warn!("service '{}' has no port matching {:?}; upstream '{}' has no endpoints", service_key, service_port, name);
    }

    upstreams.insert(name.to_string(), upstream);
}

fn port_number_hint(port_ref: &PortRef) -> u16 {
    match port_ref {
        PortRef::Number(n) => *n,
        PortRef::Name(_) => 0,
    }
}

fn resolve_external_name(_external_host: &str, service_port: &PortRef) -> Vec<Endpoint> {
    match service_port {
        PortRef::Number(n) => vec![Endpoint { address: _external_host.to_string(), port: *n }],
        PortRef::Name(name) => match name.parse::<u16>() {
            Ok(n) => vec![Endpoint { address: _external_host.to_string(), port: n }],
            Err(_) => {
                warn!("ExternalName service port '{}' is not numeric; synthesizing no endpoint", name);
                Vec::new()
            }
        },
    }
}

fn order_endpoints(endpoints: &mut [Endpoint], sort_backends: bool) {
    if sort_backends {
        endpoints.sort_by(|a, b| a.address.cmp(&b.address).then(a.port.cmp(&b.port)));
    } else {
        let mut rng = rand::thread_rng();
        endpoints.shuffle(&mut rng);
    }
}

fn merge_canary_alternatives(
    ingresses: &[&Ingress],
    store: &dyn Store,
    upstreams: &mut AHashMap<String, Upstream>,
    servers: &mut AHashMap<String, Server>,
) {
    let mut to_drop: Vec<String> = Vec::new();

    for ingress in ingresses {
        let annotations = store.get_ingress_annotations(&ingress.key());
        if !annotations.canary.enabled {
            continue;
        }

        for rule in &ingress.rules {
            let host = if rule.host.is_empty() { DEFAULT_SERVER_HOST.to_string() } else { rule.host.clone() };
            for path in &rule.paths {
                let canary_upstream_name = upstream_name(&ingress.namespace, &path.service_name, &path.service_port);
                let mut matched = false;

                if let Some(server) = servers.get_mut(&host) {
                    if let Some(location) = server.find_location_mut(&path.path) {
                        if location.backend != canary_upstream_name {
                            if let Some(primary) = upstreams.get_mut(&location.backend) {
                                if !primary.alternative_backends.contains(&canary_upstream_name) {
                                    primary.alternative_backends.push(canary_upstream_name.clone());
                                }
                                matched = true;
                            }
                        }
                    }
                }

                if let Some(upstream) = upstreams.get_mut(&canary_upstream_name) {
                    upstream.no_server = true;
                }

                if !matched {
                    to_drop.push(canary_upstream_name);
                }
            }
        }
    }

    for name in to_drop {
        if upstreams.remove(&name).is_some() {
            warn!("canary upstream '{}' matched no location; dropped", name);
        }
    }
}

fn resolve_certificates(store: &dyn Store, servers: &mut AHashMap<String, Server>) {
    let tls_secrets = store.list_tls_secrets();
    let default_cert = store.get_default_ssl_certificate();
    let now = Utc::now();

    for (host, server) in servers.iter_mut() {
        if server.ssl_cert.is_some() || host == DEFAULT_SERVER_HOST {
            continue;
        }

        let matched = tls_secrets
            .iter()
            .find(|s| s.cert.hosts.iter().any(|h| h == host))
            .or_else(|| tls_secrets.iter().find(|s| s.cert.matches_host(host)));

        let resolved = matched.cloned().or_else(|| default_cert.clone());

        match resolved {
            Some(secret) => {
                if secret.cert.expires_within(240, now) {
                    warn!("certificate for '{}' expires within 240h ({})", host, secret.cert.expire_time);
                }
                server.ssl_cert = Some(secret.cert);
            }
            None => {
                warn!("no matching or default TLS certificate found for host '{}'", host);
            }
        }
    }
}

fn prune_and_sort(
    mut upstreams: AHashMap<String, Upstream>,
    mut servers: AHashMap<String, Server>,
) -> (Vec<Upstream>, Vec<Server>) {
    let mut synthetic: Vec<Upstream> = Vec::new();

    for server in servers.values_mut() {
        for location in server.locations.iter_mut() {
            if location.backend.is_empty() {
                continue;
            }
            let has_endpoints = upstreams.get(&location.backend).map(|u| !u.endpoints.is_empty()).unwrap_or(false);
            if has_endpoints {
                continue;
            }

            if let Some(custom_name) = &location.annotations.custom_default_backend {
                let custom_key = format!("{}/{}", location.ingress_ref.split('/').next().unwrap_or(""), custom_name);
                if let Some(custom) = upstreams.get(&custom_key) {
                    if !custom.endpoints.is_empty() {
                        let synthetic_name = format!("custom-default-backend-{}", custom_name);
                        synthetic.push(custom.clone_as(synthetic_name.clone()));
                        location.backend = synthetic_name;
                        continue;
                    }
                }
            }

            warn!(
                "upstream '{}' has no endpoints and no usable custom default backend; location '{}{}' returns 503",
                location.backend, server.hostname, location.path
            );
            location.backend = String::new();
        }
    }

    for upstream in synthetic {
        upstreams.insert(upstream.name.clone(), upstream);
    }

    let passthrough_backend_names: Vec<String> = servers
        .values()
        .filter(|s| s.ssl_passthrough)
        .flat_map(|s| s.locations.iter().map(|l| l.backend.clone()))
        .filter(|b| !b.is_empty())
        .collect();
    for name in &passthrough_backend_names {
        if let Some(upstream) = upstreams.get_mut(name) {
            upstream.ssl_passthrough = true;
        }
    }

    let mut backends: Vec<Upstream> = upstreams
        .into_values()
        .filter(|u| !u.endpoints.is_empty() || u.name == DEFAULT_BACKEND_NAME || u.name.starts_with("custom-default-backend-"))
        .collect();
    backends.sort_by(|a, b| a.name.cmp(&b.name));

    let mut server_list: Vec<Server> = servers.into_values().collect();
    for server in server_list.iter_mut() {
        server.sort_locations();
    }
    server_list.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    (backends, server_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ingress::{IngressPath, IngressRule};
    use crate::model::store::{InMemoryStore, Service, ServicePort};

    fn make_ingress(ns: &str, name: &str, rv: u64, host: &str, path: &str, service: &str, port: u16) -> Ingress {
        Ingress {
            namespace: ns.to_string(),
            name: name.to_string(),
            resource_version: rv,
            default_backend: None,
            rules: vec![IngressRule {
                host: host.to_string(),
                paths: vec![IngressPath {
                    path: path.to_string(),
                    service_name: service.to_string(),
                    service_port: PortRef::Number(port),
                }],
            }],
            tls: Vec::new(),
        }
    }

    #[test]
    fn empty_cluster_has_only_default_server_and_backend() {
        let store = InMemoryStore::new();
        let model = build_model(&[], &store, true);

        assert_eq!(model.servers.len(), 1);
        assert_eq!(model.servers[0].hostname, DEFAULT_SERVER_HOST);
        assert_eq!(model.backends.len(), 1);
        assert_eq!(model.backends[0].name, DEFAULT_BACKEND_NAME);
        assert_eq!(model.backends[0].endpoints[0].address, "127.0.0.1");
    }

    #[test]
    fn single_ingress_one_rule_builds_expected_server_and_upstream() {
        let mut store = InMemoryStore::new();
        store.services.insert(
            "default/svc".to_string(),
            Service {
                namespace: "default".to_string(),
                name: "svc".to_string(),
                cluster_ip: Some("10.0.0.5".to_string()),
                ports: vec![ServicePort { name: None, number: 80, target_port: None }],
                external_name: None,
            },
        );
        let port = ServicePort { name: None, number: 80, target_port: None };
        store = store.with_endpoints("default/svc", &port, vec!["10.1.0.1".to_string(), "10.1.0.2".to_string()]);

        let ingress = make_ingress("default", "my-ingress", 1, "a.example.com", "/", "svc", 80);
        let model = build_model(&[ingress], &store, true);

        assert!(model.find_server("a.example.com").is_some());
        let server = model.find_server("a.example.com").unwrap();
        assert_eq!(server.locations.len(), 1);
        assert_eq!(server.locations[0].backend, "default-svc-80");

        let backend = model.find_backend("default-svc-80").unwrap();
        assert_eq!(backend.endpoints.len(), 2);
    }

    #[test]
    fn first_writer_wins_on_host_path_collision() {
        let mut store = InMemoryStore::new();
        for svc in ["svc-a", "svc-b"] {
            store.services.insert(
                format!("default/{}", svc),
                Service {
                    namespace: "default".to_string(),
                    name: svc.to_string(),
                    cluster_ip: Some("10.0.0.1".to_string()),
                    ports: vec![ServicePort { name: None, number: 80, target_port: None }],
                    external_name: None,
                },
            );
            let port = ServicePort { name: None, number: 80, target_port: None };
            store = store.with_endpoints(&format!("default/{}", svc), &port, vec!["10.1.0.1".to_string()]);
        }

        let ingress_first = make_ingress("default", "first", 1, "a.example.com", "/", "svc-a", 80);
        let ingress_second = make_ingress("default", "second", 2, "a.example.com", "/", "svc-b", 80);

        let model = build_model(&[ingress_second, ingress_first], &store, true);
        let server = model.find_server("a.example.com").unwrap();
        assert_eq!(server.locations[0].backend, "default-svc-a-80");
    }

    #[test]
    fn zero_endpoint_upstream_clears_location_backend() {
        let mut store = InMemoryStore::new();
        store.services.insert(
            "default/svc".to_string(),
            Service {
                namespace: "default".to_string(),
                name: "svc".to_string(),
                cluster_ip: Some("10.0.0.5".to_string()),
                ports: vec![ServicePort { name: None, number: 80, target_port: None }],
                external_name: None,
            },
        );

        let ingress = make_ingress("default", "my-ingress", 1, "a.example.com", "/", "svc", 80);
        let model = build_model(&[ingress], &store, true);

        let server = model.find_server("a.example.com").unwrap();
        assert_eq!(server.locations[0].backend, "");
    }

    #[test]
    fn tls_with_non_matching_san_falls_back_to_default_certificate() {
        let mut store = InMemoryStore::new();
        store.secrets.insert(
            "default/mismatched-cert".to_string(),
            crate::model::store::Secret {
                namespace: "default".to_string(),
                name: "mismatched-cert".to_string(),
                cert: SslCert {
                    pem_file_name: "a.pem".to_string(),
                    pem_sha: "sha-a".to_string(),
                    pem_cert_key: "default/mismatched-cert".to_string(),
                    expire_time: Utc::now() + chrono::Duration::days(90),
                    hosts: vec!["other.example.com".to_string()],
                },
            },
        );
        store.default_ssl_certificate = Some(crate::model::store::Secret {
            namespace: "default".to_string(),
            name: "default-cert".to_string(),
            cert: SslCert {
                pem_file_name: "default.pem".to_string(),
                pem_sha: "sha-default".to_string(),
                pem_cert_key: "default/default-cert".to_string(),
                expire_time: Utc::now() + chrono::Duration::days(90),
                hosts: vec!["*".to_string()],
            },
        });

        let ingress = make_ingress("default", "my-ingress", 1, "a.example.com", "/", "svc", 80);
        let model = build_model(&[ingress], &store, true);

        let server = model.find_server("a.example.com").unwrap();
        assert_eq!(server.ssl_cert.as_ref().unwrap().pem_file_name, "default.pem");
    }

    #[test]
    fn upstream_merge_fills_only_empty_fields_from_later_occurrence() {
        let mut store = InMemoryStore::new();
        store.services.insert(
            "default/svc".to_string(),
            Service {
                namespace: "default".to_string(),
                name: "svc".to_string(),
                cluster_ip: Some("10.0.0.5".to_string()),
                ports: vec![ServicePort { name: None, number: 80, target_port: None }],
                external_name: None,
            },
        );

        let ingress_first = make_ingress("default", "first", 1, "a.example.com", "/", "svc", 80);
        let ingress_second = make_ingress("default", "second", 2, "b.example.com", "/", "svc", 80);

        store.annotations.insert(
            ingress_first.key(),
            AnnotationsRecord { load_balancing: Some("ewma".to_string()), ..Default::default() },
        );
        store.annotations.insert(
            ingress_second.key(),
            AnnotationsRecord {
                load_balancing: Some("round_robin".to_string()),
                upstream_hash_by: Some("$remote_addr".to_string()),
                ..Default::default()
            },
        );

        let model = build_model(&[ingress_first, ingress_second], &store, true);
        let backend = model.find_backend("default-svc-80").unwrap();

        // First occurrence's `load_balancing` wins; the second only patches
        // the hole it left in `upstream_hash_by`.
        assert_eq!(backend.load_balancing.as_deref(), Some("ewma"));
        assert_eq!(backend.upstream_hash_by.as_deref(), Some("$remote_addr"));
    }

    #[test]
    fn alias_colliding_with_existing_hostname_is_cleared() {
        let mut store = InMemoryStore::new();
        for svc in ["svc-a", "svc-b"] {
            store.services.insert(
                format!("default/{}", svc),
                Service {
                    namespace: "default".to_string(),
                    name: svc.to_string(),
                    cluster_ip: Some("10.0.0.1".to_string()),
                    ports: vec![ServicePort { name: None, number: 80, target_port: None }],
                    external_name: None,
                },
            );
        }

        let ingress_a = make_ingress("default", "alias-owner", 1, "a.example.com", "/", "svc-a", 80);
        let ingress_b = make_ingress("default", "target", 2, "b.example.com", "/", "svc-b", 80);

        store.annotations.insert(
            ingress_a.key(),
            AnnotationsRecord { alias: Some("b.example.com".to_string()), ..Default::default() },
        );

        let model = build_model(&[ingress_a, ingress_b], &store, true);
        let server = model.find_server("a.example.com").unwrap();
        assert_eq!(server.alias, None);
    }
}
