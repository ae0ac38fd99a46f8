//! Action gateway: admission control for agent-invoked actions.
//!
//! A service publishes a manifest of the actions machine callers may invoke.
//! The gateway sits in front of the handlers for those actions and, per
//! request, resolves the action, throttles agent clients, checks
//! authentication, validates parameters against the declared schema and
//! writes an audit record before the handler runs.
//!
//! ```ignore
//! let registry = RegistryHandle::new(ManifestRegistry::parse(&text)?);
//! let gateway = ActionGateway::builder(registry).build();
//! let app = Router::new().route(
//!     "/cart/add",
//!     gateway.guard("add_to_cart").gated(post(add_to_cart)),
//! );
//! ```

pub mod admin;
pub mod audit;
pub mod config;
pub mod gateway;
pub mod http;
pub mod input;
pub mod lifecycle;
pub mod manifest;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use gateway::{ActionGateway, ActionGuard, ActionParams, Rejection};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use manifest::{ManifestRegistry, RegistryHandle};
