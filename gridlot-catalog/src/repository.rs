use crate::config::TierConfig;
use crate::tier::Tier;
use async_trait::async_trait;

/// Repository trait for tier configuration access
#[async_trait]
pub trait TierConfigRepository: Send + Sync {
    async fn get(
        &self,
        tier: Tier,
    ) -> Result<Option<TierConfig>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list(&self) -> Result<Vec<TierConfig>, Box<dyn std::error::Error + Send + Sync>>;

    /// Flip availability, recording the acting operator. Returns false when
    /// the tier row does not exist. Takes effect for the next reservation
    /// attempt immediately because reservations always re-read the row.
    async fn set_availability(
        &self,
        tier: Tier,
        available: bool,
        actor: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}
