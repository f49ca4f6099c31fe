//! Reduced-view JSON POSTs to the data plane's admin endpoint, with
//! bounded exponential-backoff retry.

use crate::error::{ReconcileError, Result};
use crate::model::backend::Endpoint;
use crate::model::RoutingModel;
use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;

/// Number of retry attempts before a dynamic patch surfaces as failed.
const RETRY_STEPS: u32 = 15;
/// Initial backoff delay.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Multiplicative decay applied to the backoff delay after each attempt.
const BACKOFF_FACTOR: f64 = 0.8;
/// Fractional jitter applied to each computed delay.
const JITTER: f64 = 0.1;

#[derive(Debug, Clone, Serialize)]
pub struct BackendView {
    pub name: String,
    pub port: u16,
    pub ssl_passthrough: bool,
    pub session_affinity: crate::model::backend::SessionAffinity,
    pub upstream_hash_by: Option<String>,
    pub load_balancing: Option<String>,
    pub no_server: bool,
    pub traffic_shaping_policy: Option<crate::model::annotations::TrafficShapingPolicy>,
    pub alternative_backends: Vec<String>,
    pub endpoints: Vec<Endpoint>,
}

impl From<&crate::model::Backend> for BackendView {
    fn from(b: &crate::model::Backend) -> Self {
        Self {
            name: b.name.clone(),
            port: b.port,
            ssl_passthrough: b.ssl_passthrough,
            session_affinity: b.session_affinity.clone(),
            upstream_hash_by: b.upstream_hash_by.clone(),
            load_balancing: b.load_balancing.clone(),
            no_server: b.no_server,
            traffic_shaping_policy: b.traffic_shaping_policy.clone(),
            alternative_backends: b.alternative_backends.clone(),
            endpoints: b.endpoints.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCertView {
    pub hostname: String,
    pub pem_cert_key: String,
}

/// The admin HTTP surface the dynamic patch pipeline POSTs to. Abstracted
/// behind a trait so the retry/backoff logic is testable without a real
/// listening admin endpoint; [`ReqwestAdminHttp`] is the production
/// implementation.
#[async_trait]
pub trait AdminHttp: Send + Sync {
    /// POSTs `body` to `path` and returns the response status code, or an
    /// error string on a transport failure.
    async fn post_json(&self, path: &str, body: serde_json::Value) -> std::result::Result<u16, String>;
}

/// Production [`AdminHttp`] backed by `reqwest`.
pub struct ReqwestAdminHttp {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestAdminHttp {
    pub fn new(status_port: u16) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("reqwest client should always build with a static config"),
            base_url: format!("http://localhost:{}", status_port),
        }
    }
}

#[async_trait]
impl AdminHttp for ReqwestAdminHttp {
    async fn post_json(&self, path: &str, body: serde_json::Value) -> std::result::Result<u16, String> {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map(|r| r.status().as_u16())
            .map_err(|e| format!("request to {} failed: {}", url, e))
    }
}

/// Drives backend/certificate POSTs with bounded exponential-backoff
/// retry over any [`AdminHttp`] implementation.
pub struct DynamicPatchClient {
    http: Box<dyn AdminHttp>,
}

impl DynamicPatchClient {
    pub fn new(status_port: u16) -> Self {
        Self { http: Box::new(ReqwestAdminHttp::new(status_port)) }
    }

    pub fn with_client(http: Box<dyn AdminHttp>) -> Self {
        Self { http }
    }

    /// Patches backends and, if `certs` is `Some`, servers, retrying each
    /// POST independently with bounded exponential backoff.
    pub async fn patch(&self, model: &RoutingModel, certs: Option<Vec<ServerCertView>>) -> Result<()> {
        let backends: Vec<BackendView> = model.backends.iter().map(BackendView::from).collect();
        self.post_with_retry("/configuration/backends", serde_json::to_value(&backends).unwrap()).await?;

        if let Some(certs) = certs {
            self.post_with_retry("/configuration/servers", serde_json::to_value(&certs).unwrap()).await?;
        }
        Ok(())
    }

    async fn post_with_retry(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let mut delay = INITIAL_BACKOFF;
        let mut last_error = String::new();

        for attempt in 0..RETRY_STEPS {
            match self.http.post_json(path, body.clone()).await {
                Ok(201) => return Ok(()),
                Ok(status) => {
                    last_error = format!("unexpected status {} from {}", status, path);
                }
                Err(e) => {
                    last_error = e;
                }
            }

            if attempt + 1 == RETRY_STEPS {
                break;
            }

            let jittered = apply_jitter(delay);
            sleep(jittered).await;
            delay = Duration::from_secs_f64(delay.as_secs_f64() * BACKOFF_FACTOR);
        }

        Err(ReconcileError::DynamicPatchFailed(last_error))
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_fraction: f64 = rng.gen_range(-JITTER..JITTER);
    let seconds = (delay.as_secs_f64() * (1.0 + jitter_fraction)).max(0.0);
    Duration::from_secs_f64(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeAdminHttp {
        calls: Arc<AtomicUsize>,
        fail_first_n: usize,
    }

    #[async_trait]
    impl AdminHttp for FakeAdminHttp {
        async fn post_json(&self, _path: &str, _body: serde_json::Value) -> std::result::Result<u16, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first_n {
                Err("connection refused".to_string())
            } else {
                Ok(201)
            }
        }
    }

    #[test]
    fn backend_view_projects_expected_fields() {
        let mut backend = crate::model::Backend::new("ns-svc-80", 80);
        backend.endpoints.push(Endpoint { address: "10.0.0.1".to_string(), port: 80 });
        let view = BackendView::from(&backend);
        assert_eq!(view.name, "ns-svc-80");
        assert_eq!(view.endpoints.len(), 1);
    }

    #[test]
    fn jitter_stays_within_bound() {
        for _ in 0..100 {
            let delay = Duration::from_secs(1);
            let jittered = apply_jitter(delay);
            assert!(jittered.as_secs_f64() >= 0.9 && jittered.as_secs_f64() <= 1.1);
        }
    }

    #[tokio::test]
    async fn patch_succeeds_immediately_against_a_healthy_endpoint() {
        let client = DynamicPatchClient::with_client(Box::new(FakeAdminHttp {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_first_n: 0,
        }));
        let model = RoutingModel::default();
        client.patch(&model, None).await.unwrap();
    }

    #[tokio::test]
    async fn patch_retries_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = DynamicPatchClient::with_client(Box::new(FakeAdminHttp { calls: calls.clone(), fail_first_n: 2 }));
        let model = RoutingModel::default();
        client.patch(&model, None).await.unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn patch_exhausts_retries_and_surfaces_error() {
        let client = DynamicPatchClient::with_client(Box::new(FakeAdminHttp {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_first_n: usize::MAX,
        }));
        let model = RoutingModel::default();
        let result = client.patch(&model, None).await;
        assert!(result.is_err());
    }
}
