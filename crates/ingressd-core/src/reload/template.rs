//! Template context assembly and the bit-exact numeric helpers the reload
//! pipeline needs before rendering.
//!
//! Template rendering itself (the templating *language*) is out of scope;
//! this module only computes the inputs a template consumes and exposes
//! the [`Template`] trait the reload pipeline renders through.

use crate::error::{ReconcileError, Result};
use crate::model::RoutingModel;
use serde::Serialize;

/// Word size nginx aligns hash-bucket arithmetic to.
const WORD_SIZE: u64 = 8;

/// Smallest power of two `>= v`. `nextPowerOf2(0) == 0` by convention
/// (there is no meaningful bucket size for zero hostnames).
pub fn next_power_of_2(v: u64) -> u64 {
    if v == 0 {
        return 0;
    }
    if v.is_power_of_two() {
        return v;
    }
    1u64 << (64 - (v - 1).leading_zeros())
}

/// Rounds `v` up to the next multiple of `align`.
fn align_up(v: u64, align: u64) -> u64 {
    (v + align - 1) / align * align
}

/// `ServerNameHashBucketSize`/`ServerNameHashMaxSize` derivation: smallest
/// power of two `>= wordSize + wordSize + alignUp(len + 2, wordSize)`.
pub fn nginx_hash_bucket_size(len: u64) -> u64 {
    let aligned = align_up(len + 2, WORD_SIZE);
    next_power_of_2(WORD_SIZE + WORD_SIZE + aligned)
}

/// `MaxOpenFiles = (sysFileMax / workerProcesses) - 1024`, floored at 1024.
pub fn max_open_files(sys_file_max: u64, worker_processes: u64) -> u64 {
    if worker_processes == 0 {
        return 1024;
    }
    (sys_file_max / worker_processes).saturating_sub(1024).max(1024)
}

/// Everything a template needs to render the proxy configuration.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    pub model: RoutingModel,
    pub server_name_hash_bucket_size: u64,
    pub server_name_hash_max_size: u64,
    pub max_open_files: u64,
    pub dh_param_path: Option<String>,
    pub listen_ports: crate::config::settings::ListenPorts,
}

impl TemplateContext {
    pub fn build(
        model: RoutingModel,
        sys_file_max: u64,
        worker_processes: u64,
        dh_param_path: Option<String>,
        listen_ports: crate::config::settings::ListenPorts,
    ) -> Self {
        let longest_hostname = model.servers.iter().map(|s| s.hostname.len() as u64).max().unwrap_or(0);
        let total_hostname_bytes: u64 = model.servers.iter().map(|s| s.hostname.len() as u64).sum();

        Self {
            server_name_hash_bucket_size: nginx_hash_bucket_size(longest_hostname),
            server_name_hash_max_size: next_power_of_2(total_hostname_bytes.max(1)),
            max_open_files: max_open_files(sys_file_max, worker_processes),
            dh_param_path,
            listen_ports,
            model,
        }
    }
}

/// A rendered configuration, as bytes ready to validate and write.
pub struct RenderedConfig {
    pub bytes: Vec<u8>,
}

/// The template engine consumed by the reload pipeline. Its concrete
/// implementation (the templating language itself) is external; this
/// crate only needs the ability to load a template by path and render it
/// against a [`TemplateContext`].
pub trait Template: Send + Sync {
    fn write(&self, ctx: &TemplateContext) -> Result<RenderedConfig>;
}

/// Loads a [`Template`] from a filesystem path.
pub trait TemplateLoader: Send + Sync {
    fn new_template(&self, path: &str) -> Result<Box<dyn Template>>;
}

/// A minimal stand-in `Template` that serializes the context as JSON.
/// Real deployments supply their own `Template`/`TemplateLoader`
/// implementation backed by whatever templating language renders the
/// actual proxy configuration text.
pub struct JsonTemplate;

impl Template for JsonTemplate {
    fn write(&self, ctx: &TemplateContext) -> Result<RenderedConfig> {
        let bytes = serde_json::to_vec_pretty(ctx)
            .map_err(|e| ReconcileError::TemplateInvalid(e.to_string()))?;
        Ok(RenderedConfig { bytes })
    }
}
