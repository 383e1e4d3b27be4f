use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A party holding (or bidding on) slot bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holder {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Contact info as supplied by the caller. Resolution against the holder
/// table is idempotent on the email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderInfo {
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait HolderRepository: Send + Sync {
    /// Return the holder for this contact identifier, creating it on first
    /// sight. Repeated calls with the same email yield the same id.
    async fn upsert(
        &self,
        info: &HolderInfo,
    ) -> Result<Holder, Box<dyn std::error::Error + Send + Sync>>;

    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<Holder>, Box<dyn std::error::Error + Send + Sync>>;
}
