//! Dispatch of admitted requests to the upstream service.
//!
//! # Design Decisions
//! - No retries: gated actions may not be idempotent
//! - Without an upstream the handler answers with the validated parameters,
//!   which makes the gateway usable as a standalone validation endpoint

use std::str::FromStr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::GatewayConfig;
use crate::gateway::ActionParams;
use crate::input::params_to_json;

/// Where admitted requests go.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Option<Authority>,
    timeout: Duration,
}

impl Upstream {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let authority = config.upstream.address.as_deref().and_then(|addr| {
            Authority::from_str(addr)
                .inspect_err(|e| {
                    tracing::error!(
                        address = %addr,
                        error = %e,
                        "Invalid upstream address, echoing instead"
                    )
                })
                .ok()
        });

        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            authority,
            timeout: Duration::from_secs(config.timeouts.upstream_secs),
        }
    }

    pub fn authority(&self) -> Option<&Authority> {
        self.authority.as_ref()
    }
}

/// Terminal handler behind every gated route.
pub async fn forward_handler(
    State(upstream): State<Upstream>,
    Extension(ActionParams(params)): Extension<ActionParams>,
    request: Request,
) -> Response {
    let Some(authority) = upstream.authority.clone() else {
        return Json(params_to_json(&params)).into_response();
    };

    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };
    parts.headers.remove(header::HOST);
    parts.version = Version::HTTP_11;

    let request = Request::from_parts(parts, body);
    match tokio::time::timeout(upstream.timeout, upstream.client.request(request)).await {
        Ok(Ok(response)) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(e)) => {
            tracing::error!(upstream = %authority, path = %path, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
        Err(_) => {
            tracing::error!(
                upstream = %authority,
                path = %path,
                timeout_secs = upstream.timeout.as_secs(),
                "Upstream timed out"
            );
            (StatusCode::GATEWAY_TIMEOUT, "Upstream timed out").into_response()
        }
    }
}
