use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub manifest_source: String,
    pub actions: usize,
    pub tracked_clients: usize,
}

#[derive(Serialize)]
pub struct ActionSummary {
    pub id: String,
    pub method: String,
    pub endpoint: String,
    /// Effective requirement, manifest-wide settings included.
    pub authentication_required: bool,
    pub inputs: Vec<String>,
}

#[derive(Serialize)]
pub struct ClientUsage {
    pub client_id: String,
    pub requests_in_window: usize,
}

#[derive(Serialize)]
pub struct RateLimitStatus {
    pub requests_per_window: u32,
    pub window_secs: u64,
    pub burst_limit: u32,
    pub burst_window_secs: u64,
    pub tracked_clients: usize,
    pub clients: Vec<ClientUsage>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started.elapsed().as_secs(),
        manifest_source: state.source.describe(),
        actions: state.gateway.registry().snapshot().len(),
        tracked_clients: state.gateway.rate_limiter().tracked_clients(),
    })
}

pub async fn get_actions(State(state): State<AdminState>) -> Json<Vec<ActionSummary>> {
    let registry = state.gateway.registry().snapshot();
    let manifest = registry.manifest();

    let actions = manifest
        .actions
        .iter()
        .map(|action| ActionSummary {
            id: action.id.clone(),
            method: action.method.to_ascii_uppercase(),
            endpoint: action.endpoint.clone(),
            authentication_required: manifest.requires_auth(action),
            inputs: action.inputs.iter().map(|i| i.name.clone()).collect(),
        })
        .collect();

    Json(actions)
}

pub async fn get_rate_limits(State(state): State<AdminState>) -> Json<RateLimitStatus> {
    let limiter = state.gateway.rate_limiter();
    let policy = limiter.policy();
    let clients: Vec<ClientUsage> = limiter
        .usage_by_client(Instant::now())
        .into_iter()
        .map(|(client_id, requests_in_window)| ClientUsage {
            client_id,
            requests_in_window,
        })
        .collect();

    Json(RateLimitStatus {
        requests_per_window: policy.requests_per_window,
        window_secs: policy.window.as_secs(),
        burst_limit: policy.burst_limit,
        burst_window_secs: policy.burst_window.as_secs(),
        tracked_clients: clients.len(),
        clients,
    })
}

pub async fn post_reload(State(state): State<AdminState>) -> Response {
    match state.gateway.reload_from(state.source.as_ref()).await {
        Ok(actions) => Json(serde_json::json!({
            "status": "reloaded",
            "actions": actions,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
