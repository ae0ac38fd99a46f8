//! Axum middleware wrapping a handler with the admission pipeline.
//!
//! ```ignore
//! let guard = gateway.guard("add_to_cart");
//! let app = Router::new().route("/cart/add", guard.gated(post(add_to_cart)));
//! ```
//!
//! The wrapped handler keeps its own signature. It can read the validated
//! parameters through `Extension<ActionParams>`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;

use crate::gateway::pipeline::ActionGateway;
use crate::input::ParamMap;
use crate::observability::metrics;

pub const X_AI_ACTION_ID: HeaderName = HeaderName::from_static("x-ai-action-id");
pub const X_AI_ACTION_SUCCESS: HeaderName = HeaderName::from_static("x-ai-action-success");

/// Validated parameters of an admitted request, defaults included.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionParams(pub ParamMap);

/// Middleware state: the gateway plus the action a route is bound to.
#[derive(Clone)]
pub struct ActionGuard {
    gateway: ActionGateway,
    action_id: Arc<str>,
}

impl ActionGuard {
    pub(crate) fn new(gateway: ActionGateway, action_id: &str) -> Self {
        Self {
            gateway,
            action_id: Arc::from(action_id),
        }
    }

    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    /// Wrap `route` so every request it handles is admitted first. A method
    /// the route does not declare still gets a plain 405.
    pub fn gated<S>(&self, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        route.route_layer(from_fn_with_state(self.clone(), action_gateway_middleware))
    }
}

/// Admit the request, run the handler, and mark the response.
pub async fn action_gateway_middleware(
    State(guard): State<ActionGuard>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let admitted = match guard.gateway.admit(&guard.action_id, request).await {
        Ok(admitted) => admitted,
        Err(rejection) => return rejection.into_response(),
    };

    let mut response = next.run(admitted.request).await;
    let status = response.status();
    metrics::record_dispatch(&guard.action_id, status.as_u16(), start);

    tracing::debug!(
        action_id = %guard.action_id,
        status = status.as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Action dispatched"
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&guard.action_id) {
        headers.insert(X_AI_ACTION_ID, value);
    }
    headers.insert(
        X_AI_ACTION_SUCCESS,
        HeaderValue::from_static(if status.is_success() { "true" } else { "false" }),
    );
    response
}
