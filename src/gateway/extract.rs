//! Parameter extraction from an incoming request.
//!
//! Parameters come from the JSON body (write methods) or the query string
//! (everything else). Path captures are merged last and win over a body or
//! query key of the same name.

use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::http::{request::Parts, Method};

use crate::gateway::rejection::Rejection;
use crate::input::{coerce_text_params, ParamMap, ParamValue};
use crate::manifest::ActionDefinition;

/// Methods whose parameters travel in a JSON body.
pub fn reads_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Collect the parameters of `parts`/`body` for `action`.
///
/// Returns the parameter map and a body equivalent to the one consumed, so
/// the wrapped handler can still read it.
pub async fn extract_params(
    action: &ActionDefinition,
    parts: &mut Parts,
    body: Body,
    max_body_size: usize,
) -> Result<(ParamMap, Body), Rejection> {
    let captured = path_params(action, parts).await;

    let (mut params, body) = if reads_body(&parts.method) {
        let bytes = axum::body::to_bytes(body, max_body_size)
            .await
            .map_err(|_| Rejection::PayloadTooLarge {
                limit: max_body_size,
            })?;
        (json_body_params(&bytes)?, Body::from(bytes))
    } else {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|_| Rejection::invalid("Malformed query string"))?;
        (coerce_text_params(action, &pairs), body)
    };

    // The handler reads the path itself, so a capture is what gets validated.
    params.extend(captured);
    Ok((params, body))
}

async fn path_params(action: &ActionDefinition, parts: &mut Parts) -> ParamMap {
    // Absent outside a router with path captures.
    let Ok(raw) = RawPathParams::from_request_parts(parts, &()).await else {
        return ParamMap::new();
    };
    let pairs: Vec<(&str, &str)> = raw.iter().collect();
    coerce_text_params(action, &pairs)
}

/// Parse a JSON object body. An empty body or `null` means no parameters.
pub fn json_body_params(bytes: &Bytes) -> Result<ParamMap, Rejection> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ParamMap::new());
    }

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|_| Rejection::invalid("Malformed JSON body"))?;

    match value {
        serde_json::Value::Null => Ok(ParamMap::new()),
        serde_json::Value::Object(fields) => Ok(fields
            .into_iter()
            .map(|(k, v)| (k, ParamValue::from(v)))
            .collect()),
        _ => Err(Rejection::invalid("Request body must be a JSON object")),
    }
}
