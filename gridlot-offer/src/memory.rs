use crate::models::{BuyoutOffer, OfferStatus};
use crate::repository::{OfferFilter, OfferRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridlot_shared::SlotCoord;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// HashMap-backed offer store for development mode and service tests.
#[derive(Default)]
pub struct MemoryOfferStore {
    offers: Mutex<HashMap<Uuid, BuyoutOffer>>,
}

impl MemoryOfferStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, BuyoutOffer>>, String> {
        self.offers
            .lock()
            .map_err(|_| "offer store lock poisoned".to_string())
    }
}

#[async_trait]
impl OfferRepository for MemoryOfferStore {
    async fn insert(
        &self,
        offer: &BuyoutOffer,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock()?.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<BuyoutOffer>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn pending_for_buyer(
        &self,
        slot: SlotCoord,
        buyer_email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BuyoutOffer>, Box<dyn std::error::Error + Send + Sync>> {
        let offers = self.lock()?;
        Ok(offers
            .values()
            .find(|o| o.slot == slot && o.buyer_email == buyer_email && o.is_open(now))
            .cloned())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut offers = self.lock()?;
        match offers.get_mut(&id) {
            Some(o) if o.status == from => {
                o.status = to;
                o.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_other_pending(
        &self,
        slot: SlotCoord,
        except: Uuid,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let mut offers = self.lock()?;
        let mut affected = 0;
        for o in offers.values_mut() {
            if o.slot == slot && o.id != except && o.status == OfferStatus::Pending {
                o.status = OfferStatus::Cancelled;
                o.updated_at = Utc::now();
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn expire_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let mut offers = self.lock()?;
        let mut affected = 0;
        for o in offers.values_mut() {
            if o.status == OfferStatus::Pending && o.expires_at < now {
                o.status = OfferStatus::Expired;
                o.updated_at = now;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn list(
        &self,
        filter: &OfferFilter,
    ) -> Result<Vec<BuyoutOffer>, Box<dyn std::error::Error + Send + Sync>> {
        let offers = self.lock()?;
        let mut hits: Vec<BuyoutOffer> = offers
            .values()
            .filter(|o| {
                filter.status.map_or(true, |s| o.status == s)
                    && filter.slot.map_or(true, |s| o.slot == s)
            })
            .cloned()
            .collect();
        hits.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        if filter.limit > 0 {
            hits.truncate(filter.limit as usize);
        }
        Ok(hits)
    }
}
