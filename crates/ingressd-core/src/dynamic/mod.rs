//! The dynamic patch pipeline: push backend/certificate updates over the
//! data plane's admin HTTP endpoint without a full reload.

pub mod patch;

pub use patch::{BackendView, DynamicPatchClient, ServerCertView};
