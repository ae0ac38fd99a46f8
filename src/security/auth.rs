//! Pluggable authentication checks.
//!
//! The gateway only asks "is this caller authenticated?"; how that is
//! answered belongs to the host application.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, request::Parts};

use crate::config::{AuthConfig, AuthMode};

/// Decides whether a request carries acceptable credentials.
#[async_trait]
pub trait AuthCheck: Send + Sync {
    async fn is_authenticated(&self, parts: &Parts) -> bool;
}

/// Accepts any request that carries an `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderPresenceAuth;

#[async_trait]
impl AuthCheck for HeaderPresenceAuth {
    async fn is_authenticated(&self, parts: &Parts) -> bool {
        parts.headers.contains_key(header::AUTHORIZATION)
    }
}

/// Accepts `Authorization: Bearer <token>` for a fixed token set.
#[derive(Debug, Clone, Default)]
pub struct BearerTokenAuth {
    tokens: HashSet<String>,
}

impl BearerTokenAuth {
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl AuthCheck for BearerTokenAuth {
    async fn is_authenticated(&self, parts: &Parts) -> bool {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| self.tokens.contains(token.trim()))
    }
}

/// Treats every request as authenticated.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AuthCheck for AllowAll {
    async fn is_authenticated(&self, _parts: &Parts) -> bool {
        true
    }
}

/// Build the configured check.
pub fn auth_from_config(config: &AuthConfig) -> Arc<dyn AuthCheck> {
    match config.mode {
        AuthMode::Header => Arc::new(HeaderPresenceAuth),
        AuthMode::Bearer => Arc::new(BearerTokenAuth::new(config.tokens.iter().cloned())),
        AuthMode::None => Arc::new(AllowAll),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/wishlist/add");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_header_presence() {
        assert!(HeaderPresenceAuth.is_authenticated(&parts(Some("Basic abc"))).await);
        assert!(!HeaderPresenceAuth.is_authenticated(&parts(None)).await);
    }

    #[tokio::test]
    async fn test_bearer_tokens() {
        let auth = BearerTokenAuth::new(["s3cret"]);
        assert!(auth.is_authenticated(&parts(Some("Bearer s3cret"))).await);
        assert!(!auth.is_authenticated(&parts(Some("Bearer other"))).await);
        assert!(!auth.is_authenticated(&parts(Some("s3cret"))).await);
        assert!(!auth.is_authenticated(&parts(None)).await);
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = AuthConfig {
            mode: AuthMode::Bearer,
            tokens: vec!["t1".to_string()],
        };
        let auth = auth_from_config(&config);
        assert!(auth.is_authenticated(&parts(Some("Bearer t1"))).await);
    }
}
