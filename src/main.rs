//! Action gateway server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────┐
//!                      │                ACTION GATEWAY                 │
//!                      │                                               │
//!   Agent request      │  ┌────────┐   ┌────────────────────────────┐  │
//!   ───────────────────┼─▶│  http  │──▶│ gateway (per action route) │  │
//!                      │  │ server │   │  resolve → rate limit →    │  │
//!                      │  └────────┘   │  auth → validate → audit   │  │
//!                      │               └─────────────┬──────────────┘  │
//!                      │                             ▼                 │
//!   Response           │  X-AI-Action-ID      ┌──────────────┐         │
//!   ◀──────────────────┼──X-AI-Action-Success─│   forward    │◀────────┼── Upstream
//!                      │                      └──────────────┘         │
//!                      │                                               │
//!                      │  manifest (file/url, watcher, SIGHUP reload)  │
//!                      │  admin API · metrics · audit sink             │
//!                      └───────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use action_gateway::admin::{setup_admin_router, AdminState};
use action_gateway::audit::sink_from_config;
use action_gateway::config::{load_config, GatewayConfig};
use action_gateway::gateway::{ActionGateway, GatewaySettings};
use action_gateway::http::HttpServer;
use action_gateway::lifecycle::{reload_on_hangup, wait_for_shutdown_signal, Shutdown};
use action_gateway::manifest::{
    source_from_config, ManifestRegistry, ManifestWatcher, RegistryHandle,
};
use action_gateway::observability::{logging, metrics};
use action_gateway::security::{auth_from_config, run_sweeper};

#[derive(Parser)]
#[command(name = "action-gateway", version)]
#[command(about = "Admission gateway for agent-invoked actions", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Manifest file, overriding `manifest.path` and `manifest.url`.
    #[arg(short, long)]
    manifest: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(manifest) = args.manifest {
        config.manifest.path = manifest;
        config.manifest.url = None;
    }

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("action-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = config.upstream.address.as_deref().unwrap_or("none (echo)"),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let source = source_from_config(&config.manifest);
    let registry = ManifestRegistry::load_or_empty(source.as_ref()).await;

    let gateway = ActionGateway::builder(RegistryHandle::new(registry))
        .auth(auth_from_config(&config.auth))
        .audit(sink_from_config(&config.audit))
        .settings(GatewaySettings::from_config(&config))
        .build();

    let shutdown = Shutdown::new();

    // Dropping the watcher stops it, so it lives until main returns.
    let _watcher = spawn_manifest_watcher(&config, &gateway);

    tokio::spawn(run_sweeper(
        gateway.rate_limiter().clone(),
        Duration::from_secs(config.rate_limiter.sweep_interval_secs),
        shutdown.subscribe(),
    ));
    tokio::spawn(reload_on_hangup(
        gateway.clone(),
        source.clone(),
        shutdown.subscribe(),
    ));

    if config.admin.enabled {
        if config.admin.api_key == "CHANGE_ME_IN_PRODUCTION" {
            tracing::warn!("Admin API is using the placeholder API key");
        }
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");

        let router = setup_admin_router(AdminState::new(
            gateway.clone(),
            source.clone(),
            &config.admin.api_key,
        ));
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(admin_listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, gateway);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let finished = tokio::select! {
        _ = wait_for_shutdown_signal() => None,
        result = &mut server_task => Some(result),
    };
    shutdown.trigger();
    match finished {
        Some(result) => result??,
        None => server_task.await??,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Start hot reload for file manifests. Returns the watcher handle, which
/// must be kept alive.
fn spawn_manifest_watcher(
    config: &GatewayConfig,
    gateway: &ActionGateway,
) -> Option<notify::RecommendedWatcher> {
    if !config.manifest.watch || config.manifest.url.is_some() {
        return None;
    }

    let (watcher, mut updates) = ManifestWatcher::new(Path::new(&config.manifest.path));
    let handle = match watcher.run() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(
                path = %config.manifest.path,
                error = %e,
                "Manifest watcher not started, hot reload disabled"
            );
            return None;
        }
    };

    let gateway = gateway.clone();
    tokio::spawn(async move {
        while let Some(registry) = updates.recv().await {
            gateway.reload(registry);
        }
    });

    Some(handle)
}
