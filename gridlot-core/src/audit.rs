use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only operator/system action trail. Entries are never mutated or
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        actor: &str,
        action: &str,
        target_type: &str,
        target_id: impl ToString,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            action: action.to_string(),
            target_type: target_type.to_string(),
            target_id: target_id.to_string(),
            detail,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(
        &self,
        entry: &AuditLogEntry,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLogEntry>, Box<dyn std::error::Error + Send + Sync>>;
}
