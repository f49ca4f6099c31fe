//! Pre-flight validation of the runtime configuration.
//!
//! Runs once at startup, before the store or supervisor are constructed, so
//! a misconfigured deployment fails fast with an actionable message rather
//! than surfacing as a mysterious reload failure later.

use crate::config::settings::RuntimeConfig;
use log::{info, warn};

/// Errors and warnings collected while validating a [`RuntimeConfig`].
///
/// Errors block startup; warnings are logged and the engine proceeds.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

/// Validates a [`RuntimeConfig`] across structural, port, and feature-flag
/// combinations.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_comprehensive(config: &RuntimeConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_ports(config, &mut result);
        Self::validate_paths(config, &mut result);
        Self::validate_feature_combinations(config, &mut result);
        Self::log_results(&result);

        result
    }

    fn validate_ports(config: &RuntimeConfig, result: &mut ValidationResult) {
        let ports = [
            ("http", config.listen_ports.http),
            ("https", config.listen_ports.https),
            ("status", config.listen_ports.status),
            ("ssl_proxy", config.listen_ports.ssl_proxy),
            ("default", config.listen_ports.default),
        ];

        for (name, port) in ports {
            if port == 0 {
                result.add_error(format!("listen port '{}' must be nonzero", name));
            }
        }

        for i in 0..ports.len() {
            for j in (i + 1)..ports.len() {
                if ports[i].1 == ports[j].1 {
                    result.add_error(format!(
                        "listen ports '{}' and '{}' both bind {}",
                        ports[i].0, ports[j].0, ports[i].1
                    ));
                }
            }
        }
    }

    fn validate_paths(config: &RuntimeConfig, result: &mut ValidationResult) {
        if config.config_path.trim().is_empty() {
            result.add_error("config_path must not be empty".to_string());
        }
        if config.template_path.trim().is_empty() {
            result.add_error("template_path must not be empty".to_string());
        }
        if config.config_path.contains("..") || config.template_path.contains("..") {
            result.add_error("config_path/template_path must not contain '..'".to_string());
        }
    }

    fn validate_feature_combinations(config: &RuntimeConfig, result: &mut ValidationResult) {
        if config.enable_ssl_passthrough && config.listen_ports.https == config.listen_ports.ssl_proxy {
            result.add_error(
                "SSL passthrough requires a distinct ssl_proxy port from the https port"
                    .to_string(),
            );
        }

        if config.sync_rate_limit <= 0.0 {
            result.add_error("sync_rate_limit must be positive".to_string());
        } else if config.sync_rate_limit > 10.0 {
            result.add_warning(format!(
                "sync_rate_limit of {} reconciliations/sec is unusually high",
                config.sync_rate_limit
            ));
        }

        if config.update_status && config.publish_service.is_none() && config.publish_status_address.is_none() {
            result.add_warning(
                "update_status is enabled but neither publish_service nor publish_status_address is set"
                    .to_string(),
            );
        }

        if !config.dynamic_certificates_enabled {
            result.add_warning(
                "dynamic_certificates_enabled is false: certificate rotation will force a full reload"
                    .to_string(),
            );
        }

        if config.default_service.is_none() {
            result.add_warning(
                "default_service is unset: unmatched traffic falls back to the built-in default backend"
                    .to_string(),
            );
        }
    }

    fn log_results(result: &ValidationResult) {
        if result.is_valid {
            info!("runtime configuration validation passed");
        } else {
            for error in &result.errors {
                log::error!("configuration error: {}", error);
            }
        }
        for warning in &result.warnings {
            warn!("configuration warning: {}", warning);
        }
    }
}
