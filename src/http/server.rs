//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount every manifest action behind the gateway middleware
//! - Forward admitted requests to the upstream
//! - Serve the discovery documents
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener with graceful shutdown

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::gateway::ActionGateway;
use crate::http::discovery::{discovery_router, DISCOVERY_PATHS};
use crate::http::forward::{forward_handler, Upstream};

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    gateway: ActionGateway,
}

impl HttpServer {
    /// Build the server for the actions in the gateway's current manifest.
    pub fn new(config: &GatewayConfig, gateway: ActionGateway) -> Self {
        let router = Self::build_router(config, &gateway);
        Self { router, gateway }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, gateway: &ActionGateway) -> Router {
        let upstream = Upstream::from_config(config);
        let registry = gateway.registry().snapshot();

        let mut endpoints: BTreeMap<&str, MethodRouter<Upstream>> = BTreeMap::new();
        for action in registry.actions() {
            let endpoint = action.endpoint.as_str();
            if config.discovery.enabled && DISCOVERY_PATHS.contains(&endpoint) {
                tracing::warn!(
                    action_id = %action.id,
                    endpoint,
                    "Action endpoint shadows a discovery document, not mounted"
                );
                continue;
            }
            let Some(filter) = action
                .http_method()
                .and_then(|method| MethodFilter::try_from(method).ok())
            else {
                continue;
            };

            let route = gateway.guard(&action.id).gated(on(filter, forward_handler));
            let route = match endpoints.remove(endpoint) {
                Some(existing) => existing.merge(route),
                None => route,
            };
            endpoints.insert(endpoint, route);

            tracing::debug!(
                action_id = %action.id,
                method = %action.method,
                endpoint,
                "Action mounted"
            );
        }

        let mut router = Router::new();
        for (endpoint, route) in endpoints {
            router = router.route(endpoint, route);
        }
        let mut router = router.with_state(upstream);

        if config.discovery.enabled {
            router = router.merge(discovery_router(
                gateway.registry().clone(),
                config.audit.enabled,
            ));
        }

        router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gateway(&self) -> &ActionGateway {
        &self.gateway
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            actions = self.gateway.registry().snapshot().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
