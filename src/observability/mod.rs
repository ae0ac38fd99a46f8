//! Logs and metrics.
//!
//! ```text
//! admission stages, reloads, sweeper, audit failures
//!     → logging.rs  (tracing subscriber, EnvFilter)
//!     → metrics.rs  (Prometheus exporter on its own port)
//! ```
//!
//! Every gated request carries its `x-request-id` into the trace span and
//! the audit record. Audit entries go to the `audit` log target.

pub mod logging;
pub mod metrics;
