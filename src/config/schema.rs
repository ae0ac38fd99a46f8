//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the action gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where the action manifest comes from.
    pub manifest: ManifestConfig,

    /// Upstream service admitted requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Agent detection headers.
    pub agent: AgentConfig,

    /// Authentication check used for actions that require it.
    pub auth: AuthConfig,

    /// Audit trail settings.
    pub audit: AuditConfig,

    /// Rate limiter housekeeping.
    pub rate_limiter: RateLimiterConfig,

    /// Well-known discovery documents.
    pub discovery: DiscoveryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Manifest source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Path to the manifest file.
    pub path: String,

    /// Remote manifest URL. Takes precedence over `path`.
    pub url: Option<String>,

    /// Reload the manifest file when it changes (file sources only).
    pub watch: bool,

    /// Timeout for remote manifest fetches in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: ".well-known/ai-actions.json".to_string(),
            url: None,
            watch: true,
            fetch_timeout_secs: 10,
        }
    }
}

/// Upstream configuration. Without an address, admitted requests are
/// answered with an echo of the validated parameters.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: Option<String>,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upstream call timeout in seconds.
    pub upstream_secs: u64,

    /// Authentication check timeout in milliseconds.
    pub auth_ms: u64,

    /// Audit sink delivery timeout in milliseconds.
    pub audit_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 25,
            auth_ms: 2000,
            audit_ms: 500,
        }
    }
}

/// Agent detection headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Header whose value `true` marks a request as agent traffic.
    pub flag_header: String,

    /// Header carrying the agent's name (rate-limit key).
    pub name_header: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            flag_header: "X-AI-Agent".to_string(),
            name_header: "X-AI-Agent-Name".to_string(),
        }
    }
}

/// How authentication is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Any `Authorization` header is accepted.
    #[default]
    Header,
    /// `Authorization: Bearer <token>` with a token from `tokens`.
    Bearer,
    /// Every request is treated as authenticated.
    None,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,

    /// Accepted bearer tokens (mode = "bearer").
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    #[default]
    Tracing,
    File,
}

/// Audit trail configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,

    pub sink: AuditSinkKind,

    /// Output file for the `file` sink (JSON lines).
    pub path: String,

    /// Also audit requests the gateway rejected.
    pub include_rejections: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sink: AuditSinkKind::Tracing,
            path: "ai-actions-audit.jsonl".to_string(),
            include_rejections: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Interval between sweeps of idle client state, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Serve `/.well-known/ai-actions.json` and `/.well-known/ai-capabilities`.
    pub enabled: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes for gated write requests.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
