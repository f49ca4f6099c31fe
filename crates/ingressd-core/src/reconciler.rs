//! Ties the model builder, diff/decision, reload pipeline, and dynamic
//! patch pipeline together into one reconciliation attempt.
//!
//! The reconciler owns `runningConfig` (the last model successfully
//! applied) and never advances it on error, so the next reconciliation
//! retries from the last known-good baseline.

use crate::config::settings::RuntimeConfig;
use crate::diff::{self, Decision};
use crate::dynamic::patch::{DynamicPatchClient, ServerCertView};
use crate::error::Result;
use crate::model::store::Store;
use crate::model::RoutingModel;
use crate::reload::pipeline::ReloadPipeline;
use crate::reload::template::{Template, TemplateContext};
use log::info;
use tokio::sync::Mutex;

/// Owns the currently-running model and drives one reconciliation attempt
/// at a time (the single-writer invariant for the routing model).
pub struct Reconciler {
    running_config: Mutex<RoutingModel>,
    config: RuntimeConfig,
    reload_pipeline: ReloadPipeline,
    dynamic_client: DynamicPatchClient,
}

impl Reconciler {
    pub fn new(config: RuntimeConfig, reload_pipeline: ReloadPipeline, dynamic_client: DynamicPatchClient) -> Self {
        Self {
            running_config: Mutex::new(RoutingModel::default()),
            config,
            reload_pipeline,
            dynamic_client,
        }
    }

    /// Runs one reconciliation: build, diff, act, and (on success) commit
    /// the new model as the baseline for the next one.
    pub async fn reconcile(&self, store: &dyn Store, template: &dyn Template) -> Result<Decision> {
        let ingresses = store.list_ingresses();
        let mut new_model = crate::model::builder::build_model(&ingresses, store, self.config.sort_backends);

        let mut running = self.running_config.lock().await;
        let decision = diff::decide(&running, &new_model, self.config.dynamic_certificates_enabled);

        match decision {
            Decision::NoOp => {
                info!("reconciliation: no-op");
            }
            Decision::DynamicOnly => {
                info!("reconciliation: dynamic patch only");
                self.patch(&new_model).await?;
                *running = new_model;
            }
            Decision::FullReload => {
                info!("reconciliation: full reload");
                new_model.configuration_checksum = diff::configuration_checksum(&new_model);

                let template_model = if self.config.dynamic_certificates_enabled {
                    with_dynamic_cert_placeholders(&new_model)
                } else {
                    new_model.clone()
                };

                let ctx = TemplateContext::build(
                    template_model,
                    self.sys_file_max(),
                    self.worker_processes(),
                    None,
                    self.config.listen_ports.clone(),
                );
                self.reload_pipeline
                    .run(template, &ctx, self.config.opentracing_tracer.as_deref())
                    .await?;

                // Partial failure policy: if the reload succeeded but the
                // dynamic patch fails, `runningConfig` still advances to
                // reflect the reloaded state, so only the patch is retried
                // on the next reconciliation.
                *running = new_model.clone();
                self.patch(&new_model).await?;
            }
        }

        Ok(decision)
    }

    async fn patch(&self, model: &RoutingModel) -> Result<()> {
        let certs = if self.config.dynamic_certificates_enabled {
            Some(
                model
                    .servers
                    .iter()
                    .filter_map(|s| {
                        s.ssl_cert.as_ref().map(|c| ServerCertView {
                            hostname: s.hostname.clone(),
                            pem_cert_key: c.pem_cert_key.clone(),
                        })
                    })
                    .collect(),
            )
        } else {
            None
        };
        self.dynamic_client.patch(model, certs).await
    }

    fn sys_file_max(&self) -> u64 {
        read_sysctl_u64("/proc/sys/fs/file-max").unwrap_or(1_000_000)
    }

    fn worker_processes(&self) -> u64 {
        std::thread::available_parallelism().map(|n| n.get() as u64).unwrap_or(1)
    }
}

fn read_sysctl_u64(path: &str) -> Option<u64> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Clones `model` with every server's certificate identity replaced by the
/// dynamic-certificates placeholder, so the rendered configuration never
/// embeds a `pemFileName`/`pemSHA` that the admin API is about to take over.
fn with_dynamic_cert_placeholders(model: &RoutingModel) -> RoutingModel {
    let mut projected = model.clone();
    for server in projected.servers.iter_mut() {
        if let Some(cert) = &server.ssl_cert {
            server.ssl_cert = Some(cert.with_dynamic_placeholder());
        }
    }
    projected
}
