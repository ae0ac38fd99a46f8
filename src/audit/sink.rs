//! Audit sinks.
//!
//! # Design Decisions
//! - Delivery is best-effort: a failed or slow sink never changes a response
//! - Every delivery is time-boxed by the caller via [`deliver`]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::audit::record::AuditRecord;
use crate::config::{AuditConfig, AuditSinkKind};

/// Audit delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Audit sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Audit sink timed out after {0:?}")]
    Timeout(Duration),
}

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<(), SinkError>;
}

/// Emits each record as a structured `tracing` event on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let entry = serde_json::to_string(record)?;
        tracing::info!(
            target: "audit",
            action_id = %record.action_id,
            client_id = %record.client_id,
            record = %entry,
            "AI_ACTION"
        );
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonLinesAuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl AuditSink for JsonLinesAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Deliver `record`, giving up after `timeout`.
pub async fn deliver(
    sink: &dyn AuditSink,
    record: &AuditRecord,
    timeout: Duration,
) -> Result<(), SinkError> {
    match tokio::time::timeout(timeout, sink.record(record)).await {
        Ok(result) => result,
        Err(_) => Err(SinkError::Timeout(timeout)),
    }
}

/// Build the configured sink; `None` when auditing is disabled.
pub fn sink_from_config(config: &AuditConfig) -> Option<Arc<dyn AuditSink>> {
    if !config.enabled {
        return None;
    }
    match config.sink {
        AuditSinkKind::Tracing => Some(Arc::new(TracingAuditSink)),
        AuditSinkKind::File => Some(Arc::new(JsonLinesAuditSink::new(&config.path))),
    }
}
