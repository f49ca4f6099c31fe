//! Reconciliation engine for an HTTP/HTTPS ingress controller.
//!
//! This crate consumes cluster events, builds a declarative routing model
//! from ingress/service/endpoint/secret/configmap data, diffs it against
//! the model currently applied to the data plane, and drives either a
//! full reload or a dynamic patch over the data plane's admin endpoint.
//! It also supervises the data plane's child process.
//!
//! The informer/cache layer, annotation parsing, the status publisher,
//! the templating language, certificate filesystem placement, and the
//! SSL-passthrough L4 data path are external collaborators reached only
//! through the trait interfaces in [`model::store`], [`reload::template`],
//! and [`dynamic::patch`].

pub mod config;
pub mod diff;
pub mod dynamic;
pub mod error;
pub mod logs;
pub mod model;
pub mod queue;
pub mod rate_limiter;
pub mod reconciler;
pub mod reload;
pub mod supervisor;

pub use error::{ReconcileError, Result};
