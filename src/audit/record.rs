//! Audit record shape.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What happened to a gated invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Passed every check and was handed to the handler.
    Admitted,
    /// Stopped by the gateway.
    Rejected { reason: String },
}

/// One logged invocation.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action_id: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Parameter snapshot as a JSON object.
    pub params: serde_json::Value,
    pub outcome: AuditOutcome,
}

impl AuditRecord {
    pub fn new(
        action_id: impl Into<String>,
        client_id: impl Into<String>,
        params: serde_json::Value,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action_id: action_id.into(),
            client_id: client_id.into(),
            agent_name: None,
            peer_addr: None,
            request_id: None,
            params,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_outcome_inline() {
        let mut record = AuditRecord::new(
            "add_to_cart",
            "ShopBot",
            serde_json::json!({"product_id": "PROD-1"}),
            AuditOutcome::Rejected {
                reason: "validation_failed".to_string(),
            },
        );
        record.request_id = Some("req-1".to_string());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["action_id"], "add_to_cart");
        assert_eq!(json["outcome"]["status"], "rejected");
        assert_eq!(json["outcome"]["reason"], "validation_failed");
        assert_eq!(json["request_id"], "req-1");
        assert!(json.get("agent_name").is_none());
    }
}
