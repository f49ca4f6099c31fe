//! The reload pipeline: render, validate out-of-process, atomically
//! replace the live configuration, signal the proxy.

pub mod pipeline;
pub mod template;

pub use pipeline::{ReloadCommands, ReloadPipeline};
pub use template::{Template, TemplateContext, TemplateLoader};
