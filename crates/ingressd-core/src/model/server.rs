//! Virtual hosts and their locations.

use crate::model::annotations::AnnotationsRecord;
use serde::{Deserialize, Serialize};

/// A path-matched sub-configuration of a server, binding a path to an
/// upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub path: String,
    /// Name of the backing upstream, or empty for "return 503".
    pub backend: String,
    pub service: Option<String>,
    pub port: u16,
    pub is_default_backend: bool,
    /// `namespace/name` of the ingress that created this location.
    pub ingress_ref: String,
    pub annotations: AnnotationsRecord,
}

impl Location {
    pub fn placeholder(backend: impl Into<String>, ingress_ref: impl Into<String>) -> Self {
        Self {
            path: "/".to_string(),
            backend: backend.into(),
            service: None,
            port: 0,
            is_default_backend: true,
            ingress_ref: ingress_ref.into(),
            annotations: AnnotationsRecord::default(),
        }
    }
}

/// A proxy-side virtual host.
///
/// Unique by `hostname`; the synthetic catch-all host is
/// [`crate::model::DEFAULT_SERVER_HOST`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub hostname: String,
    pub ssl_cert: Option<crate::model::cert::SslCert>,
    pub ssl_ciphers: Option<String>,
    pub alias: Option<String>,
    pub server_snippet: Option<String>,
    pub auth_tls_secret: Option<String>,
    pub auth_tls_error_page: Option<String>,
    pub ssl_passthrough: bool,
    pub redirect_from_to_www: bool,
    pub locations: Vec<Location>,
}

impl Server {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ssl_cert: None,
            ssl_ciphers: None,
            alias: None,
            server_snippet: None,
            auth_tls_secret: None,
            auth_tls_error_page: None,
            ssl_passthrough: false,
            redirect_from_to_www: false,
            locations: Vec::new(),
        }
    }

    /// Finds the location at `path`, if any.
    pub fn find_location(&self, path: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.path == path)
    }

    pub fn find_location_mut(&mut self, path: &str) -> Option<&mut Location> {
        self.locations.iter_mut().find(|l| l.path == path)
    }

    /// Sorts locations by descending path length, longest match first.
    pub fn sort_locations(&mut self) {
        self.locations.sort_by(|a, b| b.path.len().cmp(&a.path.len()).then_with(|| a.path.cmp(&b.path)));
    }
}
