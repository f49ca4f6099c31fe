//! The routing model: the declarative intent the reconciler builds from
//! cluster state and hands to the reload/dynamic-patch pipelines.

pub mod annotations;
pub mod backend;
pub mod builder;
pub mod cert;
pub mod ingress;
pub mod server;
pub mod store;

pub use annotations::{AnnotationsRecord, Canary, Redirect, TrafficShapingPolicy};
pub use backend::{Backend, Endpoint, SessionAffinity, Upstream};
pub use cert::SslCert;
pub use ingress::{Ingress, IngressPath, IngressRule};
pub use server::{Location, Server};

use serde::{Deserialize, Serialize};

/// Name of the server-wide catch-all host, matching nginx's `server_name _`.
pub const DEFAULT_SERVER_HOST: &str = "_";

/// Name of the process-wide fallback upstream.
pub const DEFAULT_BACKEND_NAME: &str = "upstream-default-backend";

/// The full declarative routing intent for one reconciliation.
///
/// Built fresh on every reconciliation by [`builder::build_model`]; never
/// mutated in place afterward. The previous model is retained only to
/// compute diffs ([`crate::diff`]).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoutingModel {
    pub backends: Vec<Backend>,
    pub servers: Vec<Server>,
    pub passthrough_backends: Vec<String>,
    pub backend_config_checksum: u64,
    pub configuration_checksum: u64,
}

impl RoutingModel {
    /// Looks up a backend by name.
    pub fn find_backend(&self, name: &str) -> Option<&Backend> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Looks up a server by hostname.
    pub fn find_server(&self, host: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.hostname == host)
    }
}
