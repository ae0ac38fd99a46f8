//! Sliding-window rate limiting for agent traffic.
//!
//! Two nested windows per client: a sustained cap over the long window and a
//! burst cap over a short trailing window. Both are counted from the raw
//! admission timestamps, so the limit is exact rather than bucketed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::manifest::RateLimitSettings;
use crate::observability::metrics;

/// Limits applied to every agent client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub requests_per_window: u32,
    pub window: Duration,
    pub burst_limit: u32,
    pub burst_window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            requests_per_window: 60,
            window: Duration::from_secs(60),
            burst_limit: 10,
            burst_window: Duration::from_secs(10),
        }
    }
}

impl RateLimitPolicy {
    /// Policy from manifest settings, with defaults for absent values.
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        let defaults = Self::default();
        Self {
            requests_per_window: settings
                .requests_per_minute
                .unwrap_or(defaults.requests_per_window),
            burst_limit: settings.burst_limit.unwrap_or(defaults.burst_limit),
            ..defaults
        }
    }
}

/// Which window denied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Window,
    Burst,
}

impl LimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitScope::Window => "window",
            LimitScope::Burst => "burst",
        }
    }

    /// Message shown to a throttled caller.
    pub fn message(&self) -> &'static str {
        match self {
            LimitScope::Window => "Rate limit exceeded",
            LimitScope::Burst => "Burst limit exceeded",
        }
    }
}

/// Admission decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied {
        retry_after: Duration,
        scope: LimitScope,
    },
}

/// Per-client throttling state.
#[derive(Debug, Default)]
pub struct ClientRateState {
    /// Admission times, oldest first, all within the active window.
    timestamps: VecDeque<Instant>,
}

impl ClientRateState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) < window {
                break;
            }
            self.timestamps.pop_front();
        }
    }

    fn count_within(&self, now: Instant, span: Duration) -> usize {
        self.timestamps
            .iter()
            .filter(|&&t| now.saturating_duration_since(t) < span)
            .count()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Shared limiter. Each client's check-then-record runs under that
/// client's map entry lock, so concurrent requests from one client cannot
/// both pass on a stale count.
pub struct RateLimiter {
    clients: DashMap<String, ClientRateState>,
    policy: ArcSwap<RateLimitPolicy>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            clients: DashMap::new(),
            policy: ArcSwap::from_pointee(policy),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        **self.policy.load()
    }

    /// Replace the policy; existing client history is kept.
    pub fn set_policy(&self, policy: RateLimitPolicy) {
        self.policy.store(Arc::new(policy));
    }

    /// Decide whether `client_id` may make a request at `now`, recording it
    /// if allowed.
    pub fn admit(&self, client_id: &str, now: Instant) -> RateDecision {
        let policy = self.policy();
        let mut state = self.clients.entry(client_id.to_string()).or_default();

        state.prune(now, policy.window);

        if state.len() >= policy.requests_per_window as usize {
            return RateDecision::Denied {
                retry_after: policy.window,
                scope: LimitScope::Window,
            };
        }

        if state.count_within(now, policy.burst_window) >= policy.burst_limit as usize {
            return RateDecision::Denied {
                retry_after: policy.burst_window,
                scope: LimitScope::Burst,
            };
        }

        state.timestamps.push_back(now);
        RateDecision::Allowed
    }

    /// Number of clients with state in memory.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Requests currently counted against `client_id`.
    pub fn usage(&self, client_id: &str, now: Instant) -> usize {
        let window = self.policy().window;
        self.clients
            .get(client_id)
            .map(|state| state.count_within(now, window))
            .unwrap_or(0)
    }

    /// Requests counted against each tracked client, sorted by client id.
    pub fn usage_by_client(&self, now: Instant) -> Vec<(String, usize)> {
        let window = self.policy().window;
        let mut usage: Vec<_> = self
            .clients
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().count_within(now, window)))
            .collect();
        usage.sort();
        usage
    }

    /// Drop clients whose every timestamp has left the window. Returns the
    /// number removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let window = self.policy().window;
        let before = self.clients.len();
        self.clients.retain(|_, state| {
            state.prune(now, window);
            !state.is_empty()
        });
        before.saturating_sub(self.clients.len())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

/// Sweep idle clients every `every` until shutdown.
pub async fn run_sweeper(
    limiter: Arc<RateLimiter>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.sweep(tokio::time::Instant::now().into_std());
                let tracked = limiter.tracked_clients();
                metrics::record_tracked_clients(tracked);
                if removed > 0 {
                    tracing::debug!(removed, tracked, "Swept idle rate-limit clients");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
