//! The cluster store interface: everything the model builder reads about
//! the outside world.
//!
//! The informer/cache layer backing this trait in production is out of
//! scope for this crate; it is consumed purely through [`Store`].

use crate::model::ingress::Ingress;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A named service port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicePort {
    pub name: Option<String>,
    pub number: u16,
    pub target_port: Option<u16>,
}

/// A service, as consumed from the store. `external_name` is set only for
/// `ExternalName`-type services, which have no endpoints of their own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub namespace: String,
    pub name: String,
    pub cluster_ip: Option<String>,
    pub ports: Vec<ServicePort>,
    pub external_name: Option<String>,
}

impl Service {
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    pub fn port_by_ref(&self, port_ref: &crate::model::ingress::PortRef) -> Option<&ServicePort> {
        match port_ref {
            crate::model::ingress::PortRef::Number(n) => self.ports.iter().find(|p| p.number == *n),
            crate::model::ingress::PortRef::Name(name) => {
                self.ports.iter().find(|p| p.name.as_deref() == Some(name.as_str()))
            }
        }
    }
}

/// Resolved endpoints for one service port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServiceEndpoints {
    pub addresses: Vec<String>,
}

/// A TLS secret, as consumed from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Secret {
    pub namespace: String,
    pub name: String,
    pub cert: crate::model::cert::SslCert,
}

impl Secret {
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Everything the model builder needs about cluster state at a point in
/// time, read through a handful of narrow accessors so the builder itself
/// stays a pure function over an explicit snapshot.
pub trait Store: Send + Sync {
    fn list_ingresses(&self) -> Vec<Ingress>;
    fn get_service(&self, key: &str) -> Option<Service>;
    fn get_service_endpoints(&self, key: &str, port: &ServicePort) -> Option<ServiceEndpoints>;
    fn get_secret(&self, key: &str) -> Option<Secret>;
    fn list_tls_secrets(&self) -> Vec<Secret>;
    fn get_ingress_annotations(&self, key: &str) -> crate::model::annotations::AnnotationsRecord;
    fn get_default_backend(&self) -> Option<String>;
    fn get_default_ssl_certificate(&self) -> Option<Secret>;
}

/// A fully in-memory [`Store`], used in unit and integration tests in
/// place of a real informer-backed implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    pub ingresses: Vec<Ingress>,
    pub services: AHashMap<String, Service>,
    pub endpoints: AHashMap<String, ServiceEndpoints>,
    pub secrets: AHashMap<String, Secret>,
    pub annotations: AHashMap<String, crate::model::annotations::AnnotationsRecord>,
    pub default_backend: Option<String>,
    pub default_ssl_certificate: Option<Secret>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn endpoints_key(service_key: &str, port: &ServicePort) -> String {
        match &port.name {
            Some(name) => format!("{}:{}", service_key, name),
            None => format!("{}:{}", service_key, port.number),
        }
    }

    pub fn with_endpoints(mut self, service_key: &str, port: &ServicePort, addresses: Vec<String>) -> Self {
        self.endpoints
            .insert(Self::endpoints_key(service_key, port), ServiceEndpoints { addresses });
        self
    }
}

impl Store for InMemoryStore {
    fn list_ingresses(&self) -> Vec<Ingress> {
        self.ingresses.clone()
    }

    fn get_service(&self, key: &str) -> Option<Service> {
        self.services.get(key).cloned()
    }

    fn get_service_endpoints(&self, key: &str, port: &ServicePort) -> Option<ServiceEndpoints> {
        self.endpoints.get(&Self::endpoints_key(key, port)).cloned()
    }

    fn get_secret(&self, key: &str) -> Option<Secret> {
        self.secrets.get(key).cloned()
    }

    fn list_tls_secrets(&self) -> Vec<Secret> {
        self.secrets.values().cloned().collect()
    }

    fn get_ingress_annotations(&self, key: &str) -> crate::model::annotations::AnnotationsRecord {
        self.annotations.get(key).cloned().unwrap_or_default()
    }

    fn get_default_backend(&self) -> Option<String> {
        self.default_backend.clone()
    }

    fn get_default_ssl_certificate(&self) -> Option<Secret> {
        self.default_ssl_certificate.clone()
    }
}
