//! Admin API: runtime inspection and manifest reload.
//!
//! Served on its own listener and guarded by a bearer API key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::gateway::ActionGateway;
use crate::manifest::ManifestSource;

#[derive(Clone)]
pub struct AdminState {
    pub gateway: ActionGateway,
    /// Source used by `POST /admin/reload`.
    pub source: Arc<dyn ManifestSource>,
    pub api_key: Arc<str>,
    pub started: Instant,
}

impl AdminState {
    pub fn new(gateway: ActionGateway, source: Arc<dyn ManifestSource>, api_key: &str) -> Self {
        Self {
            gateway,
            source,
            api_key: Arc::from(api_key),
            started: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/actions", get(get_actions))
        .route("/admin/rate-limits", get(get_rate_limits))
        .route("/admin/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{InlineManifestSource, ManifestRegistry, RegistryHandle};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    const MANIFEST: &str = r#"{
        "actions": [
            {"id": "search", "method": "get", "endpoint": "/search",
             "inputs": [{"name": "q"}]},
            {"id": "checkout", "method": "POST", "endpoint": "/checkout"}
        ],
        "authentication": {"required": true, "optional_for": ["search"]}
    }"#;

    fn router(source: &str) -> Router {
        let registry = RegistryHandle::new(ManifestRegistry::parse(MANIFEST).unwrap());
        let gateway = ActionGateway::builder(registry).build();
        let source: Arc<dyn ManifestSource> = Arc::new(InlineManifestSource::new(source));
        setup_admin_router(AdminState::new(gateway, source, "secret"))
    }

    fn authed(request: axum::http::request::Builder) -> Request<Body> {
        request
            .header("Authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_api_key() {
        let response = router(MANIFEST)
            .oneshot(
                Request::get("/admin/status")
                    .header("Authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_actions_show_effective_auth() {
        let response = router(MANIFEST)
            .oneshot(authed(Request::get("/admin/actions")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body[0]["method"], "GET");
        assert_eq!(body[0]["authentication_required"], false);
        assert_eq!(body[0]["inputs"], serde_json::json!(["q"]));
        assert_eq!(body[1]["authentication_required"], true);
    }

    #[tokio::test]
    async fn test_rate_limit_status_reports_policy() {
        let response = router(MANIFEST)
            .oneshot(authed(Request::get("/admin/rate-limits")))
            .await
            .unwrap();

        let body = json(response).await;
        assert_eq!(body["requests_per_window"], 60);
        assert_eq!(body["burst_window_secs"], 10);
        assert_eq!(body["clients"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_reload_replaces_manifest() {
        let app = router(r#"{"actions": [{"id": "only", "method": "GET", "endpoint": "/only"}]}"#);

        let response = app
            .clone()
            .oneshot(authed(Request::post("/admin/reload")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["actions"], 1);

        let response = app
            .oneshot(authed(Request::get("/admin/status")))
            .await
            .unwrap();
        assert_eq!(json(response).await["actions"], 1);
    }

    #[tokio::test]
    async fn test_failed_reload_is_bad_gateway() {
        let app = router(r#"{"actions": "nope"}"#);

        let response = app
            .clone()
            .oneshot(authed(Request::post("/admin/reload")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(json(response).await["error"].is_string());

        let response = app
            .oneshot(authed(Request::get("/admin/status")))
            .await
            .unwrap();
        assert_eq!(json(response).await["actions"], 2);
    }
}
