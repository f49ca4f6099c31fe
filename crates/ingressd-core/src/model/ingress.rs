//! Ingress resources, as consumed from the (external) store.

use serde::{Deserialize, Serialize};

/// One `(path, serviceName, servicePort)` entry within an ingress rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngressPath {
    pub path: String,
    pub service_name: String,
    pub service_port: PortRef,
}

/// A service port, addressed by number or by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PortRef {
    Number(u16),
    Name(String),
}

/// A host plus the paths routed under it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngressRule {
    /// Empty host means the catch-all `_` server.
    pub host: String,
    pub paths: Vec<IngressPath>,
}

/// An optional default backend, set at the ingress spec level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultBackend {
    pub service_name: String,
    pub service_port: PortRef,
}

/// A TLS block: hosts this certificate secret should be used for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngressTls {
    pub hosts: Vec<String>,
    pub secret_name: String,
}

/// An ingress resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingress {
    pub namespace: String,
    pub name: String,
    /// Monotone version used to order ingresses deterministically and to
    /// resolve first-writer-wins collisions.
    pub resource_version: u64,
    pub default_backend: Option<DefaultBackend>,
    pub rules: Vec<IngressRule>,
    pub tls: Vec<IngressTls>,
}

impl Ingress {
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// True for the "catch-all, no rules" shape the model builder treats
    /// specially when rebinding the `_` server's root location.
    pub fn is_catch_all(&self) -> bool {
        self.default_backend.is_some() && self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_namespace_slash_name() {
        let ingress = Ingress {
            namespace: "default".to_string(),
            name: "my-ingress".to_string(),
            resource_version: 1,
            default_backend: None,
            rules: Vec::new(),
            tls: Vec::new(),
        };
        assert_eq!(ingress.key(), "default/my-ingress");
    }

    #[test]
    fn catch_all_requires_default_backend_and_no_rules() {
        let mut ingress = Ingress {
            namespace: "default".to_string(),
            name: "my-ingress".to_string(),
            resource_version: 1,
            default_backend: Some(DefaultBackend {
                service_name: "svc".to_string(),
                service_port: PortRef::Number(80),
            }),
            rules: Vec::new(),
            tls: Vec::new(),
        };
        assert!(ingress.is_catch_all());
        ingress.rules.push(IngressRule {
            host: "a.example.com".to_string(),
            paths: Vec::new(),
        });
        assert!(!ingress.is_catch_all());
    }
}
