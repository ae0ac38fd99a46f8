//! OS signal handling.
//!
//! # Design Decisions
//! - SIGTERM and SIGINT (Ctrl+C) trigger graceful shutdown
//! - SIGHUP reloads the manifest from its configured source, not the config

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::gateway::ActionGateway;
use crate::manifest::ManifestSource;

/// Resolves on the first SIGINT or SIGTERM.
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Reload the manifest on every SIGHUP until shutdown.
#[cfg(unix)]
pub async fn reload_on_hangup(
    gateway: ActionGateway,
    source: Arc<dyn ManifestSource>,
    mut shutdown: broadcast::Receiver<()>,
) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for SIGHUP");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                tracing::info!("Received SIGHUP, reloading manifest");
                // Failure is logged inside; the current manifest stays.
                let _ = gateway.reload_from(source.as_ref()).await;
            }
            _ = shutdown.recv() => break,
        }
    }
}

#[cfg(not(unix))]
pub async fn reload_on_hangup(
    _gateway: ActionGateway,
    _source: Arc<dyn ManifestSource>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let _ = shutdown.recv().await;
}
