//! Logging setup for the reconciliation engine.
//!
//! The engine never swallows an error (see [`crate::error`]) but it logs
//! loudly at every "fall back to default" and "skip this one item" edge
//! case the model builder and reload pipeline hit, since those decisions
//! are otherwise invisible to an operator.

pub mod logger;
