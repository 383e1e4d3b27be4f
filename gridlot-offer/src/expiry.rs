use crate::repository::OfferRepository;
use chrono::{DateTime, Utc};
use gridlot_core::error::CoreError;
use std::sync::Arc;

/// Scheduled offer maintenance: pending offers whose 72h window has closed
/// become EXPIRED. One conditional bulk update, safe to re-run on any
/// cadence including overlapping runs. Holder inaction is a valid terminal
/// path with no funds moved.
pub struct OfferSweeper {
    offers: Arc<dyn OfferRepository>,
}

impl OfferSweeper {
    pub fn new(offers: Arc<dyn OfferRepository>) -> Self {
        Self { offers }
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, CoreError> {
        let expired = self
            .offers
            .expire_due(now)
            .await
            .map_err(CoreError::store)?;
        if expired > 0 {
            tracing::info!(expired, "offer expiry sweep");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryOfferStore;
    use crate::models::{BuyoutOffer, OfferStatus};
    use chrono::Duration;
    use gridlot_shared::SlotCoord;
    use uuid::Uuid;

    fn offer(hours_until_deadline: i64, status: OfferStatus) -> BuyoutOffer {
        let mut o = BuyoutOffer::new(
            SlotCoord::new(2, 2).unwrap(),
            Uuid::new_v4(),
            "buyer@example.com".into(),
            None,
            5_000,
            None,
        );
        o.expires_at = Utc::now() + Duration::hours(hours_until_deadline);
        o.status = status;
        o
    }

    #[tokio::test]
    async fn expires_only_overdue_pending_offers() {
        let store = Arc::new(MemoryOfferStore::new());
        let overdue = offer(-1, OfferStatus::Pending);
        let live = offer(48, OfferStatus::Pending);
        let rejected = offer(-1, OfferStatus::Rejected);
        for o in [&overdue, &live, &rejected] {
            store.insert(o).await.unwrap();
        }

        let sweeper = OfferSweeper::new(store.clone());
        let now = Utc::now();
        assert_eq!(sweeper.sweep(now).await.unwrap(), 1);
        // Idempotent: the predicate re-excludes the row it just updated.
        assert_eq!(sweeper.sweep(now).await.unwrap(), 0);

        assert_eq!(
            store.get(overdue.id).await.unwrap().unwrap().status,
            OfferStatus::Expired
        );
        assert_eq!(
            store.get(live.id).await.unwrap().unwrap().status,
            OfferStatus::Pending
        );
        assert_eq!(
            store.get(rejected.id).await.unwrap().unwrap().status,
            OfferStatus::Rejected
        );
    }
}
