//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check settings that depend on each other (file sink needs a path)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{AuditSinkKind, AuthMode, GatewayConfig};

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.manifest.url.is_none() && config.manifest.path.trim().is_empty() {
        errors.push(ValidationError::new(
            "manifest.path",
            "either manifest.path or manifest.url must be set",
        ));
    }

    if let Some(url) = &config.manifest.url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ValidationError::new(
                "manifest.url",
                "must be an http:// or https:// URL",
            ));
        }
    }

    if let Some(address) = &config.upstream.address {
        if address.trim().is_empty() || address.contains('/') {
            errors.push(ValidationError::new(
                "upstream.address",
                "must be host:port without a scheme or path",
            ));
        }
    }

    let timeouts = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.auth_ms", config.timeouts.auth_ms),
        ("timeouts.audit_ms", config.timeouts.audit_ms),
        ("manifest.fetch_timeout_secs", config.manifest.fetch_timeout_secs),
        (
            "rate_limiter.sweep_interval_secs",
            config.rate_limiter.sweep_interval_secs,
        ),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.auth.mode == AuthMode::Bearer && config.auth.tokens.is_empty() {
        errors.push(ValidationError::new(
            "auth.tokens",
            "bearer mode needs at least one token",
        ));
    }

    if config.audit.enabled
        && config.audit.sink == AuditSinkKind::File
        && config.audit.path.trim().is_empty()
    {
        errors.push(ValidationError::new("audit.path", "file sink needs a path"));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new(
            "security.max_body_size",
            "must be greater than zero",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                "is not a socket address",
            ));
        }
        if config.admin.api_key.len() < 16 {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be at least 16 characters",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
