use crate::models::{Booking, BookingStatus, SlotCreative};
use crate::repository::BookingRepository;
use chrono::{Duration, Utc};
use gridlot_catalog::{Tier, TierConfigRepository};
use gridlot_core::error::CoreError;
use gridlot_core::identity::{HolderInfo, HolderRepository};
use gridlot_core::payment::{CheckoutRequest, CheckoutSession, PaymentGateway};
use gridlot_shared::SlotCoord;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub x: i32,
    pub y: i32,
    /// Tier as the client believes it to be; re-derived server-side to
    /// defend against stale grid state.
    pub tier: Tier,
    pub duration_days: u32,
    pub holder: HolderInfo,
    pub creative: SlotCreative,
    pub boost: bool,
}

#[derive(Debug, Clone)]
pub struct ReservationOutcome {
    pub booking: Booking,
    pub checkout: CheckoutSession,
}

/// Creates pending bookings and hands off to the payment collaborator.
pub struct ReservationService {
    bookings: Arc<dyn BookingRepository>,
    tiers: Arc<dyn TierConfigRepository>,
    holders: Arc<dyn HolderRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl ReservationService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        tiers: Arc<dyn TierConfigRepository>,
        holders: Arc<dyn HolderRepository>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            bookings,
            tiers,
            holders,
            gateway,
        }
    }

    pub async fn create(&self, req: ReservationRequest) -> Result<ReservationOutcome, CoreError> {
        // 1. Validate input and the client-claimed tier
        let slot = SlotCoord::new(req.x, req.y)
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        let tier = Tier::of(slot);
        if tier != req.tier {
            return Err(CoreError::Validation(format!(
                "slot {} is tier {}, not {}",
                slot, tier, req.tier
            )));
        }
        if req.duration_days == 0 {
            return Err(CoreError::Validation("duration must be at least one day".into()));
        }
        if req.holder.email.trim().is_empty() {
            return Err(CoreError::Validation("contact email is required".into()));
        }

        // 2. Tier must currently be open. Read fresh every time so operator
        //    flips take effect without a restart.
        let cfg = self
            .tiers
            .get(tier)
            .await
            .map_err(CoreError::store)?
            .ok_or(CoreError::TierClosed(tier))?;
        if !cfg.is_available {
            return Err(CoreError::TierClosed(tier));
        }

        // 3. Occupancy window, date granularity, half-open
        let start_date = Utc::now().date_naive();
        let end_date = start_date + Duration::days(i64::from(req.duration_days));

        // 4. Conflict check. Check-then-insert is not atomic against a
        //    concurrent reservation on the same slot; the narrow race is
        //    resolved downstream because activation id-targets one session.
        let clashing = self
            .bookings
            .find_overlapping(slot, start_date, end_date)
            .await
            .map_err(CoreError::store)?;
        if !clashing.is_empty() {
            return Err(CoreError::SlotConflict);
        }

        // 5. Price from the fresh tier config
        let amount_cents = cfg.price_per_day_cents * i64::from(req.duration_days);

        // 6. Holder identity, idempotent on email
        let holder = self
            .holders
            .upsert(&req.holder)
            .await
            .map_err(CoreError::store)?;

        // 7. Checkout session. If the provider is down nothing has been
        //    persisted yet, so the failure leaves no pending booking behind.
        let booking_id = Uuid::new_v4();
        let checkout = self
            .gateway
            .create_checkout(&CheckoutRequest {
                amount_cents,
                description: format!(
                    "Slot {} ({} tier), {} days",
                    slot, tier, req.duration_days
                ),
                success_ref: format!("booking:{}:success", booking_id),
                cancel_ref: format!("booking:{}:cancel", booking_id),
                buyer_email: req.holder.email.clone(),
            })
            .await
            .map_err(|e| CoreError::UpstreamPayment(e.to_string()))?;

        // 8. Pending booking carrying the session ref for the webhook
        let now = Utc::now();
        let booking = Booking {
            id: booking_id,
            slot,
            tier,
            holder_id: holder.id,
            status: BookingStatus::Pending,
            start_date,
            end_date,
            expires_at: None,
            amount_cents,
            payment_session_ref: Some(checkout.session_id.clone()),
            payment_charge_ref: None,
            creative: req.creative,
            boost: req.boost,
            reminder_sent: false,
            expiry_notified: false,
            created_at: now,
            updated_at: now,
        };
        self.bookings
            .insert(&booking)
            .await
            .map_err(CoreError::store)?;

        tracing::info!(
            booking = %booking.id,
            slot = %slot,
            tier = %tier,
            amount_cents,
            "reservation created, awaiting payment"
        );

        Ok(ReservationOutcome { booking, checkout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBookingStore;
    use gridlot_catalog::memory::MemoryTierConfigStore;
    use gridlot_core::payment::MockPaymentGateway;

    fn service(store: Arc<MemoryBookingStore>, tiers: Arc<MemoryTierConfigStore>) -> ReservationService {
        ReservationService::new(store.clone(), tiers, store, Arc::new(MockPaymentGateway))
    }

    fn request(x: i32, y: i32, tier: Tier, days: u32) -> ReservationRequest {
        ReservationRequest {
            x,
            y,
            tier,
            duration_days: days,
            holder: HolderInfo {
                email: "holder@example.com".into(),
                display_name: Some("Holder".into()),
            },
            creative: SlotCreative {
                display_name: "Acme".into(),
                target_url: "https://acme.example".into(),
                tagline: None,
                image_url: None,
            },
            boost: false,
        }
    }

    #[tokio::test]
    async fn creates_pending_booking_with_session_ref() {
        let store = Arc::new(MemoryBookingStore::new());
        let svc = service(store.clone(), Arc::new(MemoryTierConfigStore::with_defaults()));

        let out = svc.create(request(18, 18, Tier::One, 7)).await.unwrap();
        assert_eq!(out.booking.status, BookingStatus::Pending);
        assert_eq!(out.booking.amount_cents, 5000 * 7);
        assert_eq!(
            out.booking.payment_session_ref.as_deref(),
            Some(out.checkout.session_id.as_str())
        );
        assert!(store.get(out.booking.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rejects_stale_client_tier() {
        let store = Arc::new(MemoryBookingStore::new());
        let svc = service(store, Arc::new(MemoryTierConfigStore::with_defaults()));

        let err = svc.create(request(18, 18, Tier::Viral, 7)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_closed_tier() {
        let store = Arc::new(MemoryBookingStore::new());
        let tiers = Arc::new(MemoryTierConfigStore::with_defaults());
        tiers.set_availability(Tier::One, false, "ops").await.unwrap();
        let svc = service(store, tiers);

        let err = svc.create(request(18, 18, Tier::One, 7)).await.unwrap_err();
        assert!(matches!(err, CoreError::TierClosed(Tier::One)));
    }

    #[tokio::test]
    async fn rejects_overlapping_reservation() {
        let store = Arc::new(MemoryBookingStore::new());
        let svc = service(store, Arc::new(MemoryTierConfigStore::with_defaults()));

        svc.create(request(0, 0, Tier::CornerTen, 7)).await.unwrap();
        let err = svc.create(request(0, 0, Tier::CornerTen, 3)).await.unwrap_err();
        assert!(matches!(err, CoreError::SlotConflict));
    }

    #[tokio::test]
    async fn holder_upsert_is_idempotent_on_email() {
        let store = Arc::new(MemoryBookingStore::new());
        let svc = service(store.clone(), Arc::new(MemoryTierConfigStore::with_defaults()));

        let a = svc.create(request(5, 5, Tier::Viral, 2)).await.unwrap();
        let b = svc.create(request(6, 6, Tier::Viral, 2)).await.unwrap();
        assert_eq!(a.booking.holder_id, b.booking.holder_id);
    }
}
