//! Render → validate → atomically write → signal.

use crate::error::{ReconcileError, Result};
use crate::reload::template::{Template, TemplateContext};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

/// External commands the data plane exposes, per spec's configured CLI
/// contract: no flags to start, `-t -c <file>` to validate, `-s reload` to
/// reload.
#[derive(Debug, Clone)]
pub struct ReloadCommands {
    pub binary: String,
    pub config_path: PathBuf,
    pub opentracing_config_path: PathBuf,
}

pub struct ReloadPipeline {
    commands: ReloadCommands,
}

impl ReloadPipeline {
    pub fn new(commands: ReloadCommands) -> Self {
        Self { commands }
    }

    /// Runs the full reload pipeline against an already-built template
    /// context: render, validate, atomic write, reload signal, optional
    /// tracer JSON.
    pub async fn run(
        &self,
        template: &dyn Template,
        ctx: &TemplateContext,
        opentracing_tracer: Option<&str>,
    ) -> Result<()> {
        let rendered = template.write(ctx)?;

        self.validate(&rendered.bytes).await?;
        self.write_live(&rendered.bytes).await?;
        self.reload().await?;

        if let Some(tracer) = opentracing_tracer {
            self.write_opentracing_config(tracer).await?;
        }

        Ok(())
    }

    async fn validate(&self, bytes: &[u8]) -> Result<()> {
        let tmp_path = self.commands.config_path.with_extension("tmp-validate");
        fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| ReconcileError::ConfigurationWriteFailed(e.to_string()))?;

        let output = Command::new(&self.commands.binary)
            .arg("-t")
            .arg("-c")
            .arg(&tmp_path)
            .output()
            .await
            .map_err(|e| ReconcileError::ConfigurationTestFailed { output: e.to_string() })?;

        let _ = fs::remove_file(&tmp_path).await;

        if !output.status.success() {
            let combined = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(ReconcileError::ConfigurationTestFailed { output: combined });
        }
        Ok(())
    }

    async fn write_live(&self, bytes: &[u8]) -> Result<()> {
        atomic_write(&self.commands.config_path, bytes)
            .await
            .map_err(|e| ReconcileError::ConfigurationWriteFailed(e.to_string()))
    }

    async fn reload(&self) -> Result<()> {
        let output = Command::new(&self.commands.binary)
            .arg("-s")
            .arg("reload")
            .output()
            .await
            .map_err(|e| ReconcileError::ReloadFailed { output: e.to_string() })?;

        if !output.status.success() {
            let combined = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(ReconcileError::ReloadFailed { output: combined });
        }
        Ok(())
    }

    async fn write_opentracing_config(&self, tracer: &str) -> Result<()> {
        let body = match tracer {
            "zipkin" => serde_json::json!({ "service_name": "ingressd", "collector_host": "zipkin" }),
            "jaeger" => serde_json::json!({ "service_name": "ingressd", "sampler": { "type": "const", "param": 1 } }),
            _ => serde_json::json!({}),
        };
        let bytes = serde_json::to_vec_pretty(&body)
            .map_err(|e| ReconcileError::ConfigurationWriteFailed(e.to_string()))?;
        atomic_write(&self.commands.opentracing_config_path, &bytes)
            .await
            .map_err(|e| ReconcileError::ConfigurationWriteFailed(e.to_string()))
    }
}

/// Writes `bytes` to a temp file beside `path` then renames it into place,
/// so readers never observe a partially-written configuration.
async fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
    }

    fs::rename(&tmp_path, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoutingModel;
    use crate::reload::template::JsonTemplate;
    use tempfile::tempdir;

    fn test_ctx() -> TemplateContext {
        TemplateContext::build(
            RoutingModel::default(),
            1_000_000,
            4,
            None,
            crate::config::settings::ListenPorts::default(),
        )
    }

    #[tokio::test]
    async fn atomic_write_produces_readable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nginx.conf");
        atomic_write(&path, b"hello").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn validate_fails_when_binary_is_missing() {
        let dir = tempdir().unwrap();
        let pipeline = ReloadPipeline::new(ReloadCommands {
            binary: "/nonexistent/ingressd-data-plane".to_string(),
            config_path: dir.path().join("nginx.conf"),
            opentracing_config_path: dir.path().join("opentracing.json"),
        });
        let template = JsonTemplate;
        let ctx = test_ctx();
        let result = pipeline.run(&template, &ctx, None).await;
        assert!(result.is_err());
    }
}
