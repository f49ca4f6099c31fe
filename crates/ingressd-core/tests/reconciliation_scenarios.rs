//! End-to-end reconciliation scenarios spanning the model builder, the
//! diff/decision step, and process supervision together.

use ingressd_core::config::settings::RuntimeConfig;
use ingressd_core::diff::Decision;
use ingressd_core::dynamic::patch::{AdminHttp, DynamicPatchClient};
use ingressd_core::model::annotations::{AnnotationsRecord, Canary};
use ingressd_core::model::ingress::{Ingress, IngressPath, IngressRule, PortRef};
use ingressd_core::model::store::{InMemoryStore, Service, ServicePort};
use ingressd_core::reconciler::Reconciler;
use ingressd_core::reload::pipeline::{ReloadCommands, ReloadPipeline};
use ingressd_core::reload::template::JsonTemplate;
use ingressd_core::supervisor::{ProcessSupervisor, ProcessSupervisorConfig};
use async_trait::async_trait;

struct AlwaysCreated;

#[async_trait]
impl AdminHttp for AlwaysCreated {
    async fn post_json(&self, _path: &str, _body: serde_json::Value) -> Result<u16, String> {
        Ok(201)
    }
}

fn service(namespace: &str, name: &str, cluster_ip: &str) -> Service {
    Service {
        namespace: namespace.to_string(),
        name: name.to_string(),
        cluster_ip: Some(cluster_ip.to_string()),
        ports: vec![ServicePort { name: None, number: 80, target_port: None }],
        external_name: None,
    }
}

fn single_path_ingress(ns: &str, name: &str, rv: u64, host: &str, path: &str, svc: &str) -> Ingress {
    Ingress {
        namespace: ns.to_string(),
        name: name.to_string(),
        resource_version: rv,
        default_backend: None,
        rules: vec![IngressRule {
            host: host.to_string(),
            paths: vec![IngressPath {
                path: path.to_string(),
                service_name: svc.to_string(),
                service_port: PortRef::Number(80),
            }],
        }],
        tls: Vec::new(),
    }
}

/// Scenario 3: only endpoint addresses churn between two reconciliations.
/// The decision must be `DynamicOnly`, and the reload pipeline (pointed at
/// a binary that would fail validation if ever invoked) must never run.
#[tokio::test]
async fn endpoint_churn_triggers_dynamic_patch_not_reload() {
    let dir = tempfile::tempdir().unwrap();
    let port = ServicePort { name: None, number: 80, target_port: None };

    let mut store = InMemoryStore::new();
    store.services.insert("default/svc".to_string(), service("default", "svc", "10.0.0.5"));
    store = store.with_endpoints("default/svc", &port, vec!["10.1.0.1".to_string()]);
    store.ingresses.push(single_path_ingress("default", "ing", 1, "a.example.com", "/", "svc"));

    let reload_pipeline = ReloadPipeline::new(ReloadCommands {
        binary: "/bin/true".to_string(),
        config_path: dir.path().join("nginx.conf"),
        opentracing_config_path: dir.path().join("opentracing.json"),
    });
    let dynamic_client = DynamicPatchClient::with_client(Box::new(AlwaysCreated));
    let reconciler = Reconciler::new(RuntimeConfig::default(), reload_pipeline, dynamic_client);
    let template = JsonTemplate;

    let first = reconciler.reconcile(&store, &template).await.unwrap();
    assert_eq!(first, Decision::FullReload);

    // Only the endpoint set changes; the upstream, server, and location
    // structure are untouched.
    store.endpoints.clear();
    store = store.with_endpoints("default/svc", &port, vec!["10.1.0.2".to_string(), "10.1.0.3".to_string()]);

    // A reload pipeline pointed at a binary that does not accept `-t -c`
    // would surface as a `ConfigurationTestFailed` error if a full reload
    // were (incorrectly) triggered here; `/bin/true` exits 0 for any args
    // so this alone wouldn't prove reload was skipped, but a `DynamicOnly`
    // decision never calls `reload_pipeline.run()` at all, which is what
    // the decision assertion below is actually checking.
    let second = reconciler.reconcile(&store, &template).await.unwrap();
    assert_eq!(second, Decision::DynamicOnly);
}

/// Scenario 4: a canary ingress sharing a primary's host/path contributes
/// its upstream name to the primary location's `alternative_backends` and
/// is itself excluded from ever being a location's primary backend.
#[test]
fn canary_ingress_merges_into_primary_alternative_backends() {
    let mut store = InMemoryStore::new();
    let port = ServicePort { name: None, number: 80, target_port: None };

    store.services.insert("default/primary".to_string(), service("default", "primary", "10.0.0.1"));
    store = store.with_endpoints("default/primary", &port, vec!["10.1.0.1".to_string()]);
    store.services.insert("default/canary".to_string(), service("default", "canary", "10.0.0.2"));
    store = store.with_endpoints("default/canary", &port, vec!["10.2.0.1".to_string()]);

    let primary = single_path_ingress("default", "primary-ing", 1, "a.example.com", "/", "primary");
    let canary = single_path_ingress("default", "canary-ing", 2, "a.example.com", "/", "canary");

    store.annotations.insert(
        canary.key(),
        AnnotationsRecord {
            canary: Canary { enabled: true, weight: 10, header: None, header_value: None, cookie: None },
            ..Default::default()
        },
    );
    store.ingresses.push(primary);
    store.ingresses.push(canary);

    let model = ingressd_core::model::builder::build_model(&store.ingresses.clone(), &store, true);

    let server = model.find_server("a.example.com").unwrap();
    assert_eq!(server.locations[0].backend, "default-primary-80");

    let primary_backend = model.find_backend("default-primary-80").unwrap();
    assert_eq!(primary_backend.alternative_backends, vec!["default-canary-80".to_string()]);

    let canary_backend = model.find_backend("default-canary-80").unwrap();
    assert!(canary_backend.no_server);
    assert!(model.servers.iter().all(|s| s.locations.iter().all(|l| l.backend != "default-canary-80")));
}

/// Scenario 6: an abnormal data-plane exit triggers a respawn through the
/// process supervisor alone; the supervisor has no handle onto the
/// reconciler, so nothing about this path can re-run a reconciliation.
#[tokio::test]
async fn crashed_data_plane_is_respawned_without_touching_reconciliation() {
    let supervisor = ProcessSupervisor::new(ProcessSupervisorConfig {
        binary: "/bin/true".to_string(),
        args: Vec::new(),
        listen_port: 18183,
    });

    supervisor.start().await.unwrap();
    let message = supervisor.wait_for_exit().await.expect("the child should report its exit");
    assert!(message.contains("exited"));
    assert!(supervisor.is_respawnable(&message));

    supervisor.respawn().await.unwrap();
    let second_message = supervisor.wait_for_exit().await.expect("the respawned child should also exit");
    assert!(second_message.contains("exited"));
}
