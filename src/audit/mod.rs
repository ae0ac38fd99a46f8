//! Audit trail for gated invocations.
//!
//! The gateway builds an [`AuditRecord`] per invocation and hands it to an
//! injected [`AuditSink`]; it keeps no records itself.

pub mod record;
pub mod sink;

pub use record::{AuditOutcome, AuditRecord};
pub use sink::{deliver, sink_from_config, AuditSink, JsonLinesAuditSink, SinkError, TracingAuditSink};
