use crate::models::{BuyoutOffer, OfferStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridlot_shared::SlotCoord;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct OfferFilter {
    pub status: Option<OfferStatus>,
    pub slot: Option<SlotCoord>,
    pub limit: i64,
}

/// Repository trait for buyout offer access. Transitions are conditional
/// on the expected current status, same discipline as bookings.
#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn insert(
        &self,
        offer: &BuyoutOffer,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<BuyoutOffer>, Box<dyn std::error::Error + Send + Sync>>;

    /// The buyer's live offer on this slot, if one exists. Enforces the
    /// one-pending-offer-per-(slot, buyer) rule at submit time.
    async fn pending_for_buyer(
        &self,
        slot: SlotCoord,
        buyer_email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BuyoutOffer>, Box<dyn std::error::Error + Send + Sync>>;

    /// Conditional `from → to`. Returns false when the offer is no longer
    /// in `from` (someone else resolved it first).
    async fn transition(
        &self,
        id: Uuid,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Cascade on accept: every other PENDING offer on the slot becomes
    /// CANCELLED. Returns the number of offers cancelled.
    async fn cancel_other_pending(
        &self,
        slot: SlotCoord,
        except: Uuid,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;

    /// Bulk sweep: PENDING offers past their deadline become EXPIRED.
    async fn expire_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;

    async fn list(
        &self,
        filter: &OfferFilter,
    ) -> Result<Vec<BuyoutOffer>, Box<dyn std::error::Error + Send + Sync>>;
}
