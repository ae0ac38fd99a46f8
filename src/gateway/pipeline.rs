//! The admission pipeline.
//!
//! # Responsibilities
//! - Resolve the target action against the current manifest snapshot
//! - Throttle agent-flagged clients
//! - Run the injected authentication check
//! - Extract and validate parameters
//! - Emit the audit record
//!
//! # Design Decisions
//! - Stages run strictly in the order above and stop at the first rejection
//! - An unknown action touches nothing but metrics
//! - Auth and audit are time-boxed; neither can stall admission
//! - One snapshot is pinned per request, so a reload mid-request is invisible

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;

use crate::audit::{deliver, AuditOutcome, AuditRecord, AuditSink};
use crate::config::GatewayConfig;
use crate::gateway::extract::extract_params;
use crate::gateway::middleware::{ActionGuard, ActionParams};
use crate::gateway::rejection::Rejection;
use crate::input::{params_to_json, validate_inputs, ParamMap};
use crate::manifest::{ManifestError, ManifestRegistry, ManifestSource, RegistryHandle};
use crate::observability::metrics;
use crate::security::{
    AgentHeaders, AgentIdentity, AuthCheck, HeaderPresenceAuth, RateDecision, RateLimitPolicy,
    RateLimiter,
};

/// Tunables for one gateway instance.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub agent_headers: AgentHeaders,
    pub auth_timeout: Duration,
    pub audit_timeout: Duration,
    pub max_body_size: usize,
    /// Audit rejected requests for known actions as well.
    pub audit_rejections: bool,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            agent_headers: AgentHeaders::default(),
            auth_timeout: Duration::from_millis(2000),
            audit_timeout: Duration::from_millis(500),
            max_body_size: 2 * 1024 * 1024,
            audit_rejections: false,
        }
    }
}

impl GatewaySettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            agent_headers: AgentHeaders::from_config(&config.agent),
            auth_timeout: Duration::from_millis(config.timeouts.auth_ms),
            audit_timeout: Duration::from_millis(config.timeouts.audit_ms),
            max_body_size: config.security.max_body_size,
            audit_rejections: config.audit.include_rejections,
        }
    }
}

/// A request that passed every check.
#[derive(Debug)]
pub struct Admitted {
    /// The original request, body restored, with [`ActionParams`] attached.
    pub request: Request<Body>,
    /// Validated parameters including defaults.
    pub params: ParamMap,
}

struct GatewayInner {
    registry: RegistryHandle,
    limiter: Arc<RateLimiter>,
    auth: Arc<dyn AuthCheck>,
    audit: Option<Arc<dyn AuditSink>>,
    settings: GatewaySettings,
}

/// Orchestrates admission for gated actions. Cheap to clone.
#[derive(Clone)]
pub struct ActionGateway {
    inner: Arc<GatewayInner>,
}

impl ActionGateway {
    pub fn builder(registry: RegistryHandle) -> ActionGatewayBuilder {
        ActionGatewayBuilder {
            registry,
            limiter: None,
            auth: Arc::new(HeaderPresenceAuth),
            audit: None,
            settings: GatewaySettings::default(),
        }
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.inner.registry
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.inner.settings
    }

    /// Middleware state gating `action_id`.
    pub fn guard(&self, action_id: &str) -> ActionGuard {
        ActionGuard::new(self.clone(), action_id)
    }

    /// Install a new registry and refresh the rate-limit policy from it.
    /// Returns the number of actions now registered.
    pub fn reload(&self, registry: ManifestRegistry) -> usize {
        let policy = RateLimitPolicy::from_settings(&registry.manifest().rate_limits);
        let count = registry.len();

        self.inner.limiter.set_policy(policy);
        self.inner.registry.replace(registry);
        metrics::record_manifest_reload(true);

        tracing::info!(
            actions = count,
            requests_per_minute = policy.requests_per_window,
            burst_limit = policy.burst_limit,
            "Manifest reloaded"
        );
        count
    }

    /// Load from `source` and install the result. On failure the current
    /// snapshot stays in place.
    pub async fn reload_from(&self, source: &dyn ManifestSource) -> Result<usize, ManifestError> {
        match ManifestRegistry::load(source).await {
            Ok(registry) => Ok(self.reload(registry)),
            Err(e) => {
                metrics::record_manifest_reload(false);
                tracing::error!(
                    source = %source.describe(),
                    error = %e,
                    "Manifest reload failed, keeping current manifest"
                );
                Err(e)
            }
        }
    }

    /// Run every admission stage for `request` against `action_id`.
    pub async fn admit(
        &self,
        action_id: &str,
        request: Request<Body>,
    ) -> Result<Admitted, Rejection> {
        let registry = self.inner.registry.snapshot();
        let Some(action) = registry.lookup(action_id) else {
            tracing::debug!(action_id, "Unknown action");
            metrics::record_rejection(action_id, "unknown_action");
            return Err(Rejection::UnknownAction {
                action_id: action_id.to_string(),
            });
        };

        let (mut parts, body) = request.into_parts();
        let identity = AgentIdentity::from_parts(&parts, &self.inner.settings.agent_headers);
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let context = AuditContext {
            action_id,
            identity: &identity,
            request_id: request_id.as_deref(),
        };

        if identity.is_agent {
            if let RateDecision::Denied { retry_after, scope } =
                self.inner.limiter.admit(&identity.client_id, Instant::now())
            {
                tracing::warn!(
                    action_id,
                    client_id = %identity.client_id,
                    scope = scope.as_str(),
                    retry_after_secs = retry_after.as_secs(),
                    "Agent rate limited"
                );
                return Err(self
                    .reject(&context, None, Rejection::RateLimited { retry_after, scope })
                    .await);
            }
        }

        if registry.manifest().requires_auth(action) && !self.authenticate(&parts).await {
            tracing::debug!(action_id, client_id = %identity.client_id, "Authentication required");
            return Err(self.reject(&context, None, Rejection::Unauthenticated).await);
        }

        let (observed, body) =
            match extract_params(action, &mut parts, body, self.inner.settings.max_body_size)
                .await
            {
                Ok(extracted) => extracted,
                Err(rejection) => return Err(self.reject(&context, None, rejection).await),
            };

        let result = validate_inputs(action, &observed);
        if !result.valid {
            tracing::debug!(action_id, errors = ?result.errors, "Validation failed");
            let snapshot = params_to_json(&observed);
            return Err(self
                .reject(
                    &context,
                    Some(snapshot),
                    Rejection::ValidationFailed {
                        errors: result.errors,
                    },
                )
                .await);
        }

        self.audit(&context, params_to_json(&result.params), AuditOutcome::Admitted)
            .await;

        parts.extensions.insert(ActionParams(result.params.clone()));
        Ok(Admitted {
            request: Request::from_parts(parts, body),
            params: result.params,
        })
    }

    async fn authenticate(&self, parts: &axum::http::request::Parts) -> bool {
        let timeout = self.inner.settings.auth_timeout;
        match tokio::time::timeout(timeout, self.inner.auth.is_authenticated(parts)).await {
            Ok(authenticated) => authenticated,
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Auth check timed out");
                false
            }
        }
    }

    async fn reject(
        &self,
        context: &AuditContext<'_>,
        params: Option<serde_json::Value>,
        rejection: Rejection,
    ) -> Rejection {
        metrics::record_rejection(context.action_id, rejection.reason());

        if self.inner.settings.audit_rejections {
            let outcome = AuditOutcome::Rejected {
                reason: rejection.reason().to_string(),
            };
            let params = params.unwrap_or_else(|| serde_json::json!({}));
            self.audit(context, params, outcome).await;
        }
        rejection
    }

    async fn audit(
        &self,
        context: &AuditContext<'_>,
        params: serde_json::Value,
        outcome: AuditOutcome,
    ) {
        let Some(sink) = &self.inner.audit else {
            return;
        };

        let mut record = AuditRecord::new(
            context.action_id,
            context.identity.client_id.as_str(),
            params,
            outcome,
        );
        record.agent_name = context.identity.agent_name.clone();
        record.peer_addr = context.identity.peer_addr.map(|a| a.to_string());
        record.request_id = context.request_id.map(str::to_string);

        if let Err(e) = deliver(sink.as_ref(), &record, self.inner.settings.audit_timeout).await {
            metrics::record_audit_failure();
            tracing::warn!(
                action_id = context.action_id,
                audit_id = %record.id,
                error = %e,
                "Audit delivery failed"
            );
        }
    }
}

impl std::fmt::Debug for ActionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionGateway")
            .field("registry", &self.inner.registry)
            .field("tracked_clients", &self.inner.limiter.tracked_clients())
            .field("audit", &self.inner.audit.is_some())
            .finish()
    }
}

struct AuditContext<'a> {
    action_id: &'a str,
    identity: &'a AgentIdentity,
    request_id: Option<&'a str>,
}

/// Builder for [`ActionGateway`].
pub struct ActionGatewayBuilder {
    registry: RegistryHandle,
    limiter: Option<Arc<RateLimiter>>,
    auth: Arc<dyn AuthCheck>,
    audit: Option<Arc<dyn AuditSink>>,
    settings: GatewaySettings,
}

impl ActionGatewayBuilder {
    pub fn auth(mut self, auth: Arc<dyn AuthCheck>) -> Self {
        self.auth = auth;
        self
    }

    pub fn audit(mut self, sink: Option<Arc<dyn AuditSink>>) -> Self {
        self.audit = sink;
        self
    }

    pub fn settings(mut self, settings: GatewaySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Share an existing limiter. By default a new one is created with the
    /// manifest's policy.
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn build(self) -> ActionGateway {
        let limiter = self.limiter.unwrap_or_else(|| {
            let snapshot = self.registry.snapshot();
            Arc::new(RateLimiter::new(RateLimitPolicy::from_settings(
                &snapshot.manifest().rate_limits,
            )))
        });

        ActionGateway {
            inner: Arc::new(GatewayInner {
                registry: self.registry,
                limiter,
                auth: self.auth,
                audit: self.audit,
                settings: self.settings,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::SinkError;
    use crate::input::ParamValue;
    use crate::manifest::InlineManifestSource;
    use async_trait::async_trait;
    use axum::http::request::Parts;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const MANIFEST: &str = r#"{
        "actions": [
            {"id": "add_to_cart", "method": "POST", "endpoint": "/cart/add",
             "inputs": [
                {"name": "product_id", "type": "string", "required": true,
                 "validation": {"pattern": "^PROD-[A-Z0-9]+$"}},
                {"name": "quantity", "type": "integer", "default": 1,
                 "validation": {"min": 1, "max": 100}}
             ]},
            {"id": "add_to_wishlist", "method": "GET", "endpoint": "/wishlist/add",
             "authentication_required": true,
             "inputs": [{"name": "product_id", "required": true}]}
        ],
        "rate_limits": {"requests_per_minute": 60, "burst_limit": 2}
    }"#;

    #[derive(Default)]
    struct CountingAuth {
        calls: AtomicUsize,
        accept: bool,
    }

    #[async_trait]
    impl AuthCheck for CountingAuth {
        async fn is_authenticated(&self, _parts: &Parts) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.accept
        }
    }

    struct SlowAuth;

    #[async_trait]
    impl AuthCheck for SlowAuth {
        async fn is_authenticated(&self, _parts: &Parts) -> bool {
            tokio::time::sleep(Duration::from_secs(30)).await;
            true
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<AuditRecord>>,
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn record(&self, record: &AuditRecord) -> Result<(), SinkError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn record(&self, _record: &AuditRecord) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        }
    }

    struct Fixture {
        gateway: ActionGateway,
        auth: Arc<CountingAuth>,
        sink: Arc<RecordingSink>,
    }

    fn fixture(accept_auth: bool, settings: GatewaySettings) -> Fixture {
        let registry = RegistryHandle::new(ManifestRegistry::parse(MANIFEST).unwrap());
        let auth = Arc::new(CountingAuth {
            calls: AtomicUsize::new(0),
            accept: accept_auth,
        });
        let sink = Arc::new(RecordingSink::default());
        let gateway = ActionGateway::builder(registry)
            .auth(auth.clone())
            .audit(Some(sink.clone()))
            .settings(settings)
            .build();
        Fixture {
            gateway,
            auth,
            sink,
        }
    }

    fn agent_post(body: &str) -> Request<Body> {
        Request::post("/cart/add")
            .header("X-AI-Agent", "true")
            .header("X-AI-Agent-Name", "ShopBot")
            .header("x-request-id", "req-42")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_admits_valid_request_with_defaults() {
        let f = fixture(true, GatewaySettings::default());

        let admitted = f
            .gateway
            .admit("add_to_cart", agent_post(r#"{"product_id": "PROD-001"}"#))
            .await
            .unwrap();

        assert_eq!(admitted.params["quantity"], ParamValue::Integer(1));
        let ActionParams(attached) = admitted.request.extensions().get::<ActionParams>().unwrap();
        assert_eq!(attached, &admitted.params);

        let records = f.sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, AuditOutcome::Admitted);
        assert_eq!(records[0].client_id, "ShopBot");
        assert_eq!(records[0].request_id.as_deref(), Some("req-42"));
        assert_eq!(records[0].params["quantity"], 1);
    }

    #[tokio::test]
    async fn test_validation_reports_every_error() {
        let f = fixture(true, GatewaySettings::default());

        let rejection = f
            .gateway
            .admit(
                "add_to_cart",
                agent_post(r#"{"product_id": "bad-id", "quantity": 500}"#),
            )
            .await
            .unwrap_err();

        assert_eq!(
            rejection,
            Rejection::ValidationFailed {
                errors: vec![
                    "Parameter 'product_id' does not match required pattern".to_string(),
                    "Parameter 'quantity' must be <= 100".to_string(),
                ]
            }
        );
        assert!(f.sink.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action_has_no_side_effects() {
        let f = fixture(true, GatewaySettings {
            audit_rejections: true,
            ..GatewaySettings::default()
        });

        let rejection = f
            .gateway
            .admit("checkout", agent_post("{}"))
            .await
            .unwrap_err();

        assert_eq!(
            rejection,
            Rejection::UnknownAction {
                action_id: "checkout".to_string()
            }
        );
        assert_eq!(f.gateway.rate_limiter().tracked_clients(), 0);
        assert_eq!(f.auth.calls.load(Ordering::SeqCst), 0);
        assert!(f.sink.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_runs_before_auth() {
        let f = fixture(false, GatewaySettings::default());
        let request = || {
            Request::get("/wishlist/add?product_id=PROD-1")
                .header("X-AI-Agent", "true")
                .header("X-AI-Agent-Name", "Greedy")
                .body(Body::empty())
                .unwrap()
        };

        for _ in 0..2 {
            assert_eq!(
                f.gateway.admit("add_to_wishlist", request()).await.unwrap_err(),
                Rejection::Unauthenticated
            );
        }
        assert!(matches!(
            f.gateway.admit("add_to_wishlist", request()).await,
            Err(Rejection::RateLimited { .. })
        ));
        assert_eq!(f.auth.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_agent_traffic_is_not_throttled() {
        let f = fixture(true, GatewaySettings::default());

        for _ in 0..5 {
            let request = Request::post("/cart/add")
                .body(Body::from(r#"{"product_id": "PROD-1"}"#))
                .unwrap();
            assert!(f.gateway.admit("add_to_cart", request).await.is_ok());
        }
        assert_eq!(f.gateway.rate_limiter().tracked_clients(), 0);
    }

    #[tokio::test]
    async fn test_auth_runs_before_validation() {
        let f = fixture(false, GatewaySettings::default());

        let request = Request::get("/wishlist/add").body(Body::empty()).unwrap();
        assert_eq!(
            f.gateway.admit("add_to_wishlist", request).await.unwrap_err(),
            Rejection::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_auth_timeout_counts_as_unauthenticated() {
        let registry = RegistryHandle::new(ManifestRegistry::parse(MANIFEST).unwrap());
        let gateway = ActionGateway::builder(registry)
            .auth(Arc::new(SlowAuth))
            .settings(GatewaySettings {
                auth_timeout: Duration::from_millis(20),
                ..GatewaySettings::default()
            })
            .build();

        let request = Request::get("/wishlist/add?product_id=PROD-1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            gateway.admit("add_to_wishlist", request).await.unwrap_err(),
            Rejection::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_block_dispatch() {
        let registry = RegistryHandle::new(ManifestRegistry::parse(MANIFEST).unwrap());
        let gateway = ActionGateway::builder(registry)
            .audit(Some(Arc::new(FailingSink)))
            .build();

        let admitted = gateway
            .admit("add_to_cart", agent_post(r#"{"product_id": "PROD-9"}"#))
            .await;
        assert!(admitted.is_ok());
    }

    #[tokio::test]
    async fn test_rejections_audited_when_enabled() {
        let f = fixture(true, GatewaySettings {
            audit_rejections: true,
            ..GatewaySettings::default()
        });

        let _ = f
            .gateway
            .admit("add_to_cart", agent_post(r#"{"quantity": 2}"#))
            .await;

        let records = f.sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].outcome,
            AuditOutcome::Rejected {
                reason: "validation_failed".to_string()
            }
        );
        assert_eq!(records[0].params["quantity"], 2);
    }

    #[tokio::test]
    async fn test_reload_swaps_actions_and_policy() {
        let f = fixture(true, GatewaySettings::default());
        assert_eq!(f.gateway.rate_limiter().policy().burst_limit, 2);

        let source = InlineManifestSource::new(
            r#"{"actions": [{"id": "checkout", "method": "POST", "endpoint": "/checkout"}],
                "rate_limits": {"burst_limit": 5}}"#,
        );
        assert_eq!(f.gateway.reload_from(&source).await.unwrap(), 1);
        assert_eq!(f.gateway.rate_limiter().policy().burst_limit, 5);

        let request = Request::post("/checkout").body(Body::empty()).unwrap();
        assert!(f.gateway.admit("checkout", request).await.is_ok());

        let request = Request::post("/cart/add").body(Body::empty()).unwrap();
        assert!(matches!(
            f.gateway.admit("add_to_cart", request).await,
            Err(Rejection::UnknownAction { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_current_snapshot() {
        let f = fixture(true, GatewaySettings::default());

        let source = InlineManifestSource::new("{ not json");
        assert!(f.gateway.reload_from(&source).await.is_err());
        assert_eq!(f.gateway.registry().snapshot().len(), 2);
    }
}
