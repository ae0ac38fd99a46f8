//! Client-facing rejections.
//!
//! Each rejection maps to one HTTP status and a small JSON body carrying
//! only what the caller needs to fix the request.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::security::LimitScope;

/// Why the gateway refused a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Unknown action: {action_id}")]
    UnknownAction { action_id: String },

    #[error("{}", .scope.message())]
    RateLimited {
        retry_after: Duration,
        scope: LimitScope,
    },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Validation failed")]
    ValidationFailed { errors: Vec<String> },

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::UnknownAction { .. } => StatusCode::BAD_REQUEST,
            Rejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Rejection::Unauthenticated => StatusCode::UNAUTHORIZED,
            Rejection::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Rejection::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Stable machine-readable reason, used for metrics and audit.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::UnknownAction { .. } => "unknown_action",
            Rejection::RateLimited { .. } => "rate_limited",
            Rejection::Unauthenticated => "unauthenticated",
            Rejection::ValidationFailed { .. } => "validation_failed",
            Rejection::PayloadTooLarge { .. } => "payload_too_large",
        }
    }

    pub(crate) fn invalid(error: impl Into<String>) -> Self {
        Rejection::ValidationFailed {
            errors: vec![error.into()],
        }
    }
}

#[derive(Serialize)]
struct RejectionBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            Rejection::RateLimited { retry_after, .. } => Some(retry_after.as_secs().max(1)),
            _ => None,
        };
        let details = match &self {
            Rejection::ValidationFailed { errors } => Some(errors.as_slice()),
            _ => None,
        };

        let body = RejectionBody {
            error: self.to_string(),
            details,
            retry_after,
        };
        let mut response = (self.status(), Json(body)).into_response();

        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
