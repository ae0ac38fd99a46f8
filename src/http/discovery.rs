//! Well-known discovery documents for agents.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::manifest::{RateLimitSettings, RegistryHandle};

pub const MANIFEST_PATH: &str = "/.well-known/ai-actions.json";
pub const CAPABILITIES_PATH: &str = "/.well-known/ai-capabilities";
pub const SITEMAP_PATH: &str = "/.well-known/ai-sitemap.json";

/// Paths an action endpoint may not take while discovery is served.
pub const DISCOVERY_PATHS: [&str; 3] = [MANIFEST_PATH, CAPABILITIES_PATH, SITEMAP_PATH];

#[derive(Clone)]
struct DiscoveryState {
    registry: RegistryHandle,
    audit_logging: bool,
}

/// Summary of what this service offers to agents.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub version: String,
    pub supported_protocols: Vec<&'static str>,
    pub auth_methods: Vec<String>,
    pub rate_limits: RateLimitSettings,
    pub features: Vec<&'static str>,
}

/// Page index for agents. No pages are published yet.
#[derive(Debug, Serialize)]
pub struct Sitemap {
    pub version: &'static str,
    pub pages: Vec<serde_json::Value>,
}

/// Routes serving the current manifest, the capability summary and the
/// sitemap.
pub fn discovery_router(registry: RegistryHandle, audit_logging: bool) -> Router {
    Router::new()
        .route(MANIFEST_PATH, get(manifest_document))
        .route(CAPABILITIES_PATH, get(capabilities))
        .route(SITEMAP_PATH, get(sitemap))
        .with_state(DiscoveryState {
            registry,
            audit_logging,
        })
}

async fn manifest_document(State(state): State<DiscoveryState>) -> Json<serde_json::Value> {
    Json(state.registry.snapshot().document().clone())
}

async fn capabilities(State(state): State<DiscoveryState>) -> Json<Capabilities> {
    let registry = state.registry.snapshot();
    let manifest = registry.manifest();

    let mut features = vec!["structured_actions"];
    if !manifest.workflows.is_empty() {
        features.push("workflow_support");
    }
    if state.audit_logging {
        features.push("audit_logging");
    }

    Json(Capabilities {
        version: manifest.version.clone().unwrap_or_else(|| "1.0".to_string()),
        supported_protocols: vec!["HTTP/1.1", "HTTP/2"],
        auth_methods: manifest.authentication.methods.clone(),
        rate_limits: manifest.rate_limits.clone(),
        features,
    })
}

async fn sitemap() -> Json<Sitemap> {
    Json(Sitemap {
        version: "1.0",
        pages: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestRegistry;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    const MANIFEST: &str = r#"{
        "version": "1.2",
        "actions": [{"id": "search", "method": "GET", "endpoint": "/search"}],
        "workflows": [{"id": "browse", "steps": ["search"]}],
        "rate_limits": {"requests_per_minute": 30, "burst_limit": 5},
        "authentication": {"methods": ["session", "api_key"]},
        "x-vendor": true
    }"#;

    async fn get_json(router: Router, path: &str) -> serde_json::Value {
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_serves_manifest_as_published() {
        let registry = RegistryHandle::new(ManifestRegistry::parse(MANIFEST).unwrap());
        let body = get_json(discovery_router(registry, false), MANIFEST_PATH).await;
        assert_eq!(body["x-vendor"], true);
        assert_eq!(body["actions"][0]["id"], "search");
    }

    #[tokio::test]
    async fn test_capabilities_summary() {
        let registry = RegistryHandle::new(ManifestRegistry::parse(MANIFEST).unwrap());
        let body = get_json(discovery_router(registry, true), CAPABILITIES_PATH).await;

        assert_eq!(body["version"], "1.2");
        assert_eq!(body["auth_methods"], serde_json::json!(["session", "api_key"]));
        assert_eq!(body["rate_limits"]["burst_limit"], 5);
        assert_eq!(
            body["features"],
            serde_json::json!(["structured_actions", "workflow_support", "audit_logging"])
        );
    }

    #[tokio::test]
    async fn test_reload_is_visible() {
        let registry = RegistryHandle::new(ManifestRegistry::empty());
        let router = discovery_router(registry.clone(), false);
        registry.replace(ManifestRegistry::parse(MANIFEST).unwrap());

        let body = get_json(router, MANIFEST_PATH).await;
        assert_eq!(body["version"], "1.2");
    }

    #[tokio::test]
    async fn test_sitemap_is_empty() {
        let registry = RegistryHandle::new(ManifestRegistry::parse(MANIFEST).unwrap());
        let body = get_json(discovery_router(registry, false), SITEMAP_PATH).await;
        assert_eq!(body, serde_json::json!({"version": "1.0", "pages": []}));
    }
}
