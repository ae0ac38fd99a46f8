//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, trace)
//!     → one route per manifest endpoint, gated per action
//!     → forward.rs (upstream call, or parameter echo)
//!     → Send to client
//!
//! /.well-known/* → discovery.rs (current manifest, capabilities)
//! ```

pub mod discovery;
pub mod forward;
pub mod server;

pub use discovery::discovery_router;
pub use forward::Upstream;
pub use server::HttpServer;
