//! Runtime configuration for the reconciliation engine.
//!
//! Loaded once at startup from an optional JSON file merged over process
//! environment variables, then held immutably for the life of the process.
//! A change to any of these values requires a restart; the configmap-driven
//! backend configuration (rate limits, snippets, ...) is a separate,
//! hot-reloadable concern consumed through the store trait.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Listen ports for the data plane, mirroring `ListenPorts.{HTTP,HTTPS,...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListenPorts {
    pub http: u16,
    pub https: u16,
    pub status: u16,
    pub ssl_proxy: u16,
    pub default: u16,
}

impl Default for ListenPorts {
    fn default() -> Self {
        Self {
            http: 80,
            https: 443,
            status: 10246,
            ssl_proxy: 442,
            default: 8181,
        }
    }
}

/// Process-wide runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Start the L4 SSL passthrough accept loop on the HTTPS port.
    pub enable_ssl_passthrough: bool,
    /// Strip certificate identity from the diff; deliver PEM bytes dynamically.
    pub dynamic_certificates_enabled: bool,
    /// Ask the store to assemble full certificate chains.
    pub enable_ssl_chain_completion: bool,
    /// Publish load-balancer addresses back onto ingress status.
    pub update_status: bool,
    /// Publish once more during shutdown.
    pub update_status_on_shutdown: bool,
    /// Name of the service whose address is published as the LB address.
    pub publish_service: Option<String>,
    /// Explicit status address, bypassing `publish_service` lookup.
    pub publish_status_address: Option<String>,
    /// Prefer the node's internal IP when no `publish_service` is set.
    pub use_node_internal_ip: bool,
    /// Leader-election lock identifier.
    pub election_id: String,
    /// Sort upstream endpoints deterministically instead of shuffling them.
    pub sort_backends: bool,
    /// Token-bucket refill rate, reconciliations per second.
    pub sync_rate_limit: f64,
    /// Full resync interval for the store, in seconds.
    pub resync_period_secs: u64,
    /// Namespace the controller watches; empty means all namespaces.
    pub namespace: String,
    /// Name of the backend-configuration configmap.
    pub config_map_name: Option<String>,
    /// `namespace/name` of the default backend service.
    pub default_service: Option<String>,
    /// `namespace/name` of the default TLS certificate secret.
    pub default_ssl_certificate: Option<String>,
    /// Listen ports for the data plane.
    pub listen_ports: ListenPorts,
    /// Path to the rendered configuration file.
    pub config_path: String,
    /// Path to the configuration template.
    pub template_path: String,
    /// Directory of geoip data files to watch for changes.
    pub geoip_path: String,
    /// Path the OpenTracing tracer JSON is rendered to, when enabled.
    pub opentracing_config_path: String,
    /// Whether OpenTracing is enabled, and which tracer to render for.
    pub opentracing_tracer: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            enable_ssl_passthrough: false,
            dynamic_certificates_enabled: true,
            enable_ssl_chain_completion: false,
            update_status: true,
            update_status_on_shutdown: true,
            publish_service: None,
            publish_status_address: None,
            use_node_internal_ip: false,
            election_id: "ingressd-leader".to_string(),
            sort_backends: false,
            sync_rate_limit: 0.3,
            resync_period_secs: 0,
            namespace: String::new(),
            config_map_name: None,
            default_service: None,
            default_ssl_certificate: None,
            listen_ports: ListenPorts::default(),
            config_path: "/etc/nginx/nginx.conf".to_string(),
            template_path: "/etc/nginx/template/nginx.tmpl".to_string(),
            geoip_path: "/etc/nginx/geoip".to_string(),
            opentracing_config_path: "/etc/nginx/opentracing.json".to_string(),
            opentracing_tracer: None,
        }
    }
}

/// Environment variable naming the path to an optional config file, layered
/// over the built-in defaults.
const CONFIG_PATH_ENV: &str = "INGRESSD_CONFIG_PATH";

/// Loads the runtime configuration from `INGRESSD_CONFIG_PATH`, if set and
/// the file exists, falling back to built-in defaults otherwise.
///
/// Unlike the backend-configuration configmap (watched continuously through
/// the store), this is read once at process startup.
pub fn load_settings() -> Result<RuntimeConfig, Box<dyn std::error::Error>> {
    let Ok(config_path) = env::var(CONFIG_PATH_ENV) else {
        log::debug!("{} not set, using default runtime configuration", CONFIG_PATH_ENV);
        return Ok(RuntimeConfig::default());
    };

    let path = Path::new(&config_path);
    if !path.exists() {
        log::warn!(
            "{} points to '{}' which does not exist, using defaults",
            CONFIG_PATH_ENV,
            config_path
        );
        return Ok(RuntimeConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config file '{}': {}", config_path, e))?;
    let config: RuntimeConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("invalid runtime configuration JSON: {}", e))?;

    log::debug!("loaded runtime configuration from {}", config_path);
    Ok(config)
}
