//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Gated request:
//!     → agent.rs (is this agent traffic? who is the client?)
//!     → rate_limit.rs (per-client sliding windows, agents only)
//!     → auth.rs (injected credential check, when the action requires it)
//! ```
//!
//! # Design Decisions
//! - Ordinary traffic bypasses the limiter entirely
//! - Limiter state is process-lifetime only; a restart resets it
//! - Authentication is fail-closed: a slow check counts as a failure

pub mod agent;
pub mod auth;
pub mod rate_limit;

pub use agent::{AgentHeaders, AgentIdentity};
pub use auth::{auth_from_config, AllowAll, AuthCheck, BearerTokenAuth, HeaderPresenceAuth};
pub use rate_limit::{run_sweeper, LimitScope, RateDecision, RateLimitPolicy, RateLimiter};
