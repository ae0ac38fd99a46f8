//! Action gateway: admission control in front of action handlers.
//!
//! # Data Flow
//! ```text
//! request on a gated route
//!     → middleware.rs (ActionGuard bound to one action id)
//!     → pipeline.rs
//!         resolve action (manifest snapshot)
//!         → rate limit (agent traffic only)
//!         → auth check (when required)
//!         → extract.rs (path / query / JSON body) → validate
//!         → audit
//!     → wrapped handler
//!     → response marked with X-AI-Action-ID / X-AI-Action-Success
//!
//! any stage may stop the request → rejection.rs (JSON error response)
//! ```

pub mod extract;
pub mod middleware;
pub mod pipeline;
pub mod rejection;

pub use middleware::{
    action_gateway_middleware, ActionGuard, ActionParams, X_AI_ACTION_ID, X_AI_ACTION_SUCCESS,
};
pub use pipeline::{ActionGateway, ActionGatewayBuilder, Admitted, GatewaySettings};
pub use rejection::Rejection;
