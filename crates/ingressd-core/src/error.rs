//! Error taxonomy for the reconciliation engine.
//!
//! Every fallible boundary in this crate returns one of these variants so
//! the work queue's error channel (see [`crate::queue`]) can make the
//! propagation decisions described by the error handling design: retry,
//! respawn, fall back to a default, or surface to the caller without
//! advancing `runningConfig`.

use thiserror::Error;

/// Top-level error returned by a single reconciliation attempt.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The template engine rejected the template itself. Fatal at startup;
    /// on a hot reload the caller should log loudly and keep serving the
    /// last-good rendered configuration.
    #[error("template invalid: {0}")]
    TemplateInvalid(String),

    /// The data plane's `-t` validation command exited non-zero.
    /// `runningConfig` must not advance; the combined stdout/stderr of the
    /// test command is preserved for the operator.
    #[error("configuration test failed: {output}")]
    ConfigurationTestFailed { output: String },

    /// The rendered configuration could not be written to the live path.
    #[error("failed to write configuration: {0}")]
    ConfigurationWriteFailed(String),

    /// The data plane's reload command exited non-zero.
    #[error("reload failed: {output}")]
    ReloadFailed { output: String },

    /// The dynamic patch HTTP calls exhausted their retry budget.
    #[error("dynamic patch failed after retries: {0}")]
    DynamicPatchFailed(String),

    /// The supervised proxy process exited.
    #[error("process exited: {0}")]
    ProcessExited(String),

    /// A store lookup (service, secret, endpoints, ...) came back empty.
    /// Callers fall back to a default backend / default certificate / empty
    /// map rather than failing the whole reconciliation.
    #[error("store lookup missing: {0}")]
    StoreLookupMissing(String),

    /// `Stop()` was called while a shutdown was already in progress.
    #[error("shutdown already in progress")]
    ShutdownInProgress,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReconcileError>;
