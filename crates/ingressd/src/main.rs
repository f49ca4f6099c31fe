//! ingressd reconciliation daemon.
//!
//! Loads runtime configuration, wires up the store/template/admin-http
//! trait implementations, and runs the top-level event loop: work queue
//! pop -> rate limiter -> reconciler, in parallel with the data-plane
//! process supervisor and the template/geoip file watcher.

use clap::Parser;
use ingressd_core::config::settings::{load_settings, RuntimeConfig};
use ingressd_core::config::validation::ConfigValidator;
use ingressd_core::diff::Decision;
use ingressd_core::dynamic::patch::DynamicPatchClient;
use ingressd_core::logs::logger::configure_logger;
use ingressd_core::model::store::InMemoryStore;
use ingressd_core::queue::WorkQueue;
use ingressd_core::rate_limiter::RateLimiter;
use ingressd_core::reconciler::Reconciler;
use ingressd_core::reload::pipeline::{ReloadCommands, ReloadPipeline};
use ingressd_core::reload::template::JsonTemplate;
use ingressd_core::supervisor::{FileWatcher, ProcessSupervisor, ProcessSupervisorConfig};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

/// Reconciliation daemon for an HTTP/HTTPS ingress controller's data plane.
#[derive(Parser, Debug)]
#[command(name = "ingressd", version, about)]
struct Args {
    /// Path to the data-plane binary this daemon supervises and reloads.
    #[arg(long, default_value = "/usr/sbin/nginx")]
    data_plane_binary: String,
}

#[tokio::main]
async fn main() {
    configure_logger();
    let args = Args::parse();

    let config = match load_settings() {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load runtime configuration: {}", e);
            std::process::exit(1);
        }
    };

    let validation = ConfigValidator::validate_comprehensive(&config);
    if !validation.is_valid {
        for err in &validation.errors {
            error!("configuration error: {}", err);
        }
        std::process::exit(1);
    }

    info!("starting ingressd reconciliation daemon");
    if let Err(e) = run(args, config).await {
        error!("fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, config: RuntimeConfig) -> ingressd_core::Result<()> {
    let store = Arc::new(InMemoryStore::new());
    let queue = Arc::new(WorkQueue::new());
    let rate_limiter = RateLimiter::new(config.sync_rate_limit);

    let reload_pipeline = ReloadPipeline::new(ReloadCommands {
        binary: args.data_plane_binary.clone(),
        config_path: PathBuf::from(&config.config_path),
        opentracing_config_path: PathBuf::from(&config.opentracing_config_path),
    });
    let dynamic_client = DynamicPatchClient::new(config.listen_ports.status);
    let reconciler = Reconciler::new(config.clone(), reload_pipeline, dynamic_client);
    let template = JsonTemplate;

    let supervisor = Arc::new(ProcessSupervisor::new(ProcessSupervisorConfig {
        binary: args.data_plane_binary,
        args: Vec::new(),
        listen_port: config.listen_ports.http,
    }));
    supervisor.start().await?;

    FileWatcher::new(config.template_path.as_str(), config.geoip_path.as_str()).spawn(queue.clone());

    // Baseline reconciliation: establishes `runningConfig` even before the
    // first real cluster event arrives.
    queue.enqueue("initial-sync").await;

    let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("received shutdown signal, draining work queue");
                queue.shutdown();
                if let Err(e) = supervisor.stop().await {
                    error!("error while stopping data plane: {}", e);
                }
                return Ok(());
            }
            exit = supervisor.wait_for_exit() => {
                if let Some(message) = exit {
                    info!("{}", message);
                    if supervisor.is_respawnable(&message) {
                        if let Err(e) = supervisor.respawn().await {
                            error!("failed to respawn data plane: {}", e);
                        }
                    }
                }
            }
            item = queue.pop() => {
                match item {
                    Some(_work_item) => {
                        rate_limiter.accept().await;
                        match reconciler.reconcile(store.as_ref(), &template).await {
                            Ok(decision) => info!("reconciliation complete: {}", decision_label(decision)),
                            Err(e) => error!("reconciliation failed: {}", e),
                        }
                    }
                    None => {
                        info!("work queue drained after shutdown, exiting");
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn decision_label(decision: Decision) -> &'static str {
    match decision {
        Decision::NoOp => "no-op",
        Decision::DynamicOnly => "dynamic-only",
        Decision::FullReload => "full-reload",
    }
}
