use crate::models::{BuyoutOffer, OfferStatus};
use crate::repository::OfferRepository;
use crate::settlement::{settle, Settlement};
use chrono::Utc;
use gridlot_booking::models::{Booking, BookingStatus, SlotCreative};
use gridlot_booking::repository::BookingRepository;
use gridlot_catalog::TierConfigRepository;
use gridlot_core::audit::{AuditLogEntry, AuditLogRepository};
use gridlot_core::error::CoreError;
use gridlot_core::identity::{HolderInfo, HolderRepository};
use gridlot_core::notify::{NotificationKind, Notifier};
use gridlot_shared::SlotCoord;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OfferRequest {
    pub x: i32,
    pub y: i32,
    pub booking_id: Uuid,
    pub buyer_email: String,
    pub buyer_name: Option<String>,
    pub amount_cents: i64,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferDecision {
    Accept,
    Reject,
}

impl FromStr for OfferDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(OfferDecision::Accept),
            "reject" => Ok(OfferDecision::Reject),
            other => Err(format!("unknown decision: {}", other)),
        }
    }
}

/// Who is resolving the offer. Holders must own the target booking;
/// operators bypass that check and leave an audit entry.
#[derive(Debug, Clone)]
pub enum ResolveAuthority {
    Holder(Uuid),
    Operator(String),
}

#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Accepted {
        offer: BuyoutOffer,
        settlement: Settlement,
        booking: Booking,
    },
    Rejected(BuyoutOffer),
}

/// Buyout negotiation: one pending offer per (slot, buyer), a binary
/// accept/reject decision inside a 72h window, and a slot transfer on
/// accept.
pub struct NegotiationService {
    offers: Arc<dyn OfferRepository>,
    bookings: Arc<dyn BookingRepository>,
    tiers: Arc<dyn TierConfigRepository>,
    holders: Arc<dyn HolderRepository>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLogRepository>,
    min_offer_cents: i64,
}

impl NegotiationService {
    pub fn new(
        offers: Arc<dyn OfferRepository>,
        bookings: Arc<dyn BookingRepository>,
        tiers: Arc<dyn TierConfigRepository>,
        holders: Arc<dyn HolderRepository>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditLogRepository>,
        min_offer_cents: i64,
    ) -> Self {
        Self {
            offers,
            bookings,
            tiers,
            holders,
            notifier,
            audit,
            min_offer_cents,
        }
    }

    pub async fn submit(&self, req: OfferRequest) -> Result<BuyoutOffer, CoreError> {
        // 1. Validate amount. The protocol floor is positivity; the
        //    configured minimum is an operator knob, zero by default.
        if req.amount_cents <= 0 || req.amount_cents < self.min_offer_cents {
            return Err(CoreError::Validation(
                "offer amount is below the minimum".into(),
            ));
        }
        if req.buyer_email.trim().is_empty() {
            return Err(CoreError::Validation("buyer email is required".into()));
        }
        let slot = SlotCoord::new(req.x, req.y)
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        // 2. Target booking must be the active occupant of this slot
        let booking = self
            .bookings
            .get(req.booking_id)
            .await
            .map_err(CoreError::store)?
            .ok_or(CoreError::NotFound("booking"))?;
        if booking.slot != slot {
            return Err(CoreError::Validation(
                "booking does not belong to that slot".into(),
            ));
        }
        if booking.status != BookingStatus::Active {
            return Err(CoreError::BookingNotActive);
        }

        // 3. One live offer per buyer per slot
        let now = Utc::now();
        if self
            .offers
            .pending_for_buyer(slot, &req.buyer_email, now)
            .await
            .map_err(CoreError::store)?
            .is_some()
        {
            return Err(CoreError::DuplicateOffer);
        }

        // 4. Open the 72h decision window
        let offer = BuyoutOffer::new(
            slot,
            booking.id,
            req.buyer_email,
            req.buyer_name,
            req.amount_cents,
            req.message,
        );
        self.offers
            .insert(&offer)
            .await
            .map_err(CoreError::store)?;

        tracing::info!(
            offer = %offer.id,
            slot = %slot,
            amount_cents = offer.amount_cents,
            "buyout offer submitted"
        );

        // 5. Tell the holder, best effort
        if let Ok(Some(holder)) = self.holders.find(booking.holder_id).await {
            let data = serde_json::json!({
                "slot": slot.to_string(),
                "amount_cents": offer.amount_cents,
                "expires_at": offer.expires_at,
                "message": offer.message,
            });
            if let Err(err) = self
                .notifier
                .notify(NotificationKind::OfferReceived, &holder.email, data)
                .await
            {
                tracing::error!(offer = %offer.id, error = %err, "offer notification failed");
            }
        }

        Ok(offer)
    }

    pub async fn resolve(
        &self,
        offer_id: Uuid,
        decision: OfferDecision,
        authority: ResolveAuthority,
    ) -> Result<ResolveOutcome, CoreError> {
        let offer = self
            .offers
            .get(offer_id)
            .await
            .map_err(CoreError::store)?
            .ok_or(CoreError::NotFound("offer"))?;
        let now = Utc::now();
        if !offer.is_open(now) {
            return Err(CoreError::AlreadyResolved);
        }

        let booking = self
            .bookings
            .get(offer.booking_id)
            .await
            .map_err(CoreError::store)?
            .ok_or(CoreError::NotFound("booking"))?;
        if let ResolveAuthority::Holder(holder_id) = &authority {
            if *holder_id != booking.holder_id {
                return Err(CoreError::Unauthorized);
            }
        }

        match decision {
            OfferDecision::Reject => {
                if !self
                    .offers
                    .transition(offer_id, OfferStatus::Pending, OfferStatus::Rejected)
                    .await
                    .map_err(CoreError::store)?
                {
                    return Err(CoreError::AlreadyResolved);
                }
                tracing::info!(offer = %offer.id, "buyout offer rejected");
                self.audit_resolution(&authority, &offer, "rejected", None)
                    .await;
                let mut resolved = offer;
                resolved.status = OfferStatus::Rejected;
                Ok(ResolveOutcome::Rejected(resolved))
            }
            OfferDecision::Accept => {
                // Settlement from a fresh tier read; the rate is the live
                // daily price of the booking's tier.
                let cfg = self
                    .tiers
                    .get(booking.tier)
                    .await
                    .map_err(CoreError::store)?
                    .ok_or(CoreError::NotFound("tier config"))?;
                let settlement = settle(
                    booking.remaining_days(now.date_naive()),
                    cfg.price_per_day_cents,
                    offer.amount_cents,
                );

                // The buyer becomes a holder of record
                let buyer = self
                    .holders
                    .upsert(&HolderInfo {
                        email: offer.buyer_email.clone(),
                        display_name: offer.buyer_name.clone(),
                    })
                    .await
                    .map_err(CoreError::store)?;

                // Single-winner write: the transfer is conditional on the
                // booking still being active and still held by the seller.
                // A racing expiry sweep or competing accept makes this
                // match zero rows, and we bail out without touching the
                // offer.
                let creative = SlotCreative {
                    display_name: offer
                        .buyer_name
                        .clone()
                        .unwrap_or_else(|| offer.buyer_email.clone()),
                    target_url: String::new(),
                    tagline: None,
                    image_url: None,
                };
                if !self
                    .bookings
                    .transfer_holder(booking.id, booking.holder_id, buyer.id, &creative)
                    .await
                    .map_err(CoreError::store)?
                {
                    return Err(CoreError::AlreadyResolved);
                }

                if !self
                    .offers
                    .transition(offer_id, OfferStatus::Pending, OfferStatus::Accepted)
                    .await
                    .map_err(CoreError::store)?
                {
                    // Transfer won but the offer was flipped concurrently;
                    // state is consistent, report the no-op.
                    return Err(CoreError::AlreadyResolved);
                }

                // Cascade: every sibling pending offer on this slot dies
                let cancelled = self
                    .offers
                    .cancel_other_pending(offer.slot, offer_id)
                    .await
                    .map_err(CoreError::store)?;

                tracing::info!(
                    offer = %offer.id,
                    slot = %offer.slot,
                    holder_payout_cents = settlement.holder_payout_cents,
                    platform_fee_cents = settlement.platform_fee_cents,
                    cancelled_siblings = cancelled,
                    "buyout offer accepted, slot transferred"
                );
                self.audit_resolution(&authority, &offer, "accepted", Some(&settlement))
                    .await;

                let booking = self
                    .bookings
                    .get(booking.id)
                    .await
                    .map_err(CoreError::store)?
                    .ok_or(CoreError::NotFound("booking"))?;
                let mut resolved = offer;
                resolved.status = OfferStatus::Accepted;
                Ok(ResolveOutcome::Accepted {
                    offer: resolved,
                    settlement,
                    booking,
                })
            }
        }
    }

    /// The splits land in the audit trail either way; operator resolutions
    /// record the acting operator as the actor.
    async fn audit_resolution(
        &self,
        authority: &ResolveAuthority,
        offer: &BuyoutOffer,
        outcome: &str,
        settlement: Option<&Settlement>,
    ) {
        let actor = match authority {
            ResolveAuthority::Holder(id) => format!("holder:{}", id),
            ResolveAuthority::Operator(name) => format!("operator:{}", name),
        };
        let detail = serde_json::json!({
            "outcome": outcome,
            "slot": offer.slot.to_string(),
            "amount_cents": offer.amount_cents,
            "settlement": settlement,
        });
        let entry = AuditLogEntry::new(&actor, "offer.resolve", "offer", offer.id, detail);
        if let Err(err) = self.audit.append(&entry).await {
            tracing::error!(offer = %offer.id, error = %err, "audit append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryOfferStore;
    use gridlot_booking::memory::MemoryBookingStore;
    use gridlot_booking::reservation::{ReservationRequest, ReservationService};
    use gridlot_catalog::memory::MemoryTierConfigStore;
    use gridlot_catalog::Tier;
    use gridlot_core::notify::LogNotifier;
    use gridlot_core::payment::{MockPaymentGateway, PaymentEvent};

    struct Fixture {
        store: Arc<MemoryBookingStore>,
        offers: Arc<MemoryOfferStore>,
        service: NegotiationService,
        booking: Booking,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryBookingStore::new());
        let offers = Arc::new(MemoryOfferStore::new());
        let tiers = Arc::new(MemoryTierConfigStore::with_defaults());

        // An active booking on the center slot, created through the normal
        // reservation + activation path.
        let reservations = ReservationService::new(
            store.clone(),
            tiers.clone(),
            store.clone(),
            Arc::new(MockPaymentGateway),
        );
        let out = reservations
            .create(ReservationRequest {
                x: 18,
                y: 18,
                tier: Tier::One,
                duration_days: 10,
                holder: HolderInfo {
                    email: "seller@example.com".into(),
                    display_name: Some("Seller".into()),
                },
                creative: SlotCreative {
                    display_name: "Seller Co".into(),
                    target_url: "https://seller.example".into(),
                    tagline: None,
                    image_url: None,
                },
                boost: false,
            })
            .await
            .unwrap();
        let activation = gridlot_booking::ActivationService::new(
            store.clone(),
            store.clone(),
            Arc::new(LogNotifier),
        );
        activation
            .apply(PaymentEvent::SessionCompleted {
                session_ref: out.booking.payment_session_ref.clone().unwrap(),
                charge_ref: "ch_fixture".into(),
                customer_ref: None,
            })
            .await
            .unwrap();
        let booking = store.get(out.booking.id).await.unwrap().unwrap();

        let service = NegotiationService::new(
            offers.clone(),
            store.clone(),
            tiers,
            store.clone(),
            Arc::new(LogNotifier),
            store.clone(),
            0,
        );
        Fixture {
            store,
            offers,
            service,
            booking,
        }
    }

    fn offer_req(booking: &Booking, email: &str, amount: i64) -> OfferRequest {
        OfferRequest {
            x: booking.slot.x,
            y: booking.slot.y,
            booking_id: booking.id,
            buyer_email: email.into(),
            buyer_name: Some("Buyer".into()),
            amount_cents: amount,
            message: None,
        }
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let f = fixture().await;
        let err = f
            .service
            .submit(offer_req(&f.booking, "buyer@example.com", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn one_pending_offer_per_buyer_per_slot() {
        let f = fixture().await;
        f.service
            .submit(offer_req(&f.booking, "buyer@example.com", 10_000))
            .await
            .unwrap();
        let err = f
            .service
            .submit(offer_req(&f.booking, "buyer@example.com", 12_000))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateOffer));
        // A different buyer is fine.
        f.service
            .submit(offer_req(&f.booking, "other@example.com", 12_000))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn offers_require_an_active_booking() {
        let f = fixture().await;
        f.store
            .admin_cancel(f.booking.id, "ops", "test")
            .await
            .unwrap();
        let err = f
            .service
            .submit(offer_req(&f.booking, "buyer@example.com", 10_000))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BookingNotActive));
    }

    #[tokio::test]
    async fn only_the_slot_holder_may_resolve() {
        let f = fixture().await;
        let offer = f
            .service
            .submit(offer_req(&f.booking, "buyer@example.com", 10_000))
            .await
            .unwrap();
        let err = f
            .service
            .resolve(
                offer.id,
                OfferDecision::Accept,
                ResolveAuthority::Holder(Uuid::new_v4()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized));
    }

    #[tokio::test]
    async fn reject_moves_no_funds_and_is_terminal() {
        let f = fixture().await;
        let offer = f
            .service
            .submit(offer_req(&f.booking, "buyer@example.com", 10_000))
            .await
            .unwrap();
        let outcome = f
            .service
            .resolve(
                offer.id,
                OfferDecision::Reject,
                ResolveAuthority::Holder(f.booking.holder_id),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, ResolveOutcome::Rejected(_)));

        // Second decision on the same offer is an idempotent no-op.
        let err = f
            .service
            .resolve(
                offer.id,
                OfferDecision::Accept,
                ResolveAuthority::Holder(f.booking.holder_id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyResolved));
    }

    #[tokio::test]
    async fn accept_transfers_slot_and_cancels_siblings() {
        let f = fixture().await;
        let winner = f
            .service
            .submit(offer_req(&f.booking, "winner@example.com", 20_000))
            .await
            .unwrap();
        let loser_a = f
            .service
            .submit(offer_req(&f.booking, "a@example.com", 9_000))
            .await
            .unwrap();
        let loser_b = f
            .service
            .submit(offer_req(&f.booking, "b@example.com", 8_000))
            .await
            .unwrap();

        let outcome = f
            .service
            .resolve(
                winner.id,
                OfferDecision::Accept,
                ResolveAuthority::Holder(f.booking.holder_id),
            )
            .await
            .unwrap();

        let ResolveOutcome::Accepted {
            settlement,
            booking,
            ..
        } = outcome
        else {
            panic!("expected acceptance");
        };

        // Settlement on the reference numbers: 10 days remaining at the One
        // tier's EUR 50/day, EUR 200 offered.
        assert_eq!(settlement.residual_value_cents, 10 * 5000);
        assert_eq!(
            settlement.holder_payout_cents,
            (10 * 5000 * 70 + 50) / 100 + (20_000 * 30 + 50) / 100
        );
        assert_eq!(settlement.platform_fee_cents, 4_000);

        // Holder changed, occupancy window preserved.
        assert_ne!(booking.holder_id, f.booking.holder_id);
        assert_eq!(booking.end_date, f.booking.end_date);
        assert_eq!(booking.status, BookingStatus::Active);

        // Cascade: both sibling offers are cancelled, winner accepted.
        assert_eq!(
            f.offers.get(winner.id).await.unwrap().unwrap().status,
            OfferStatus::Accepted
        );
        assert_eq!(
            f.offers.get(loser_a.id).await.unwrap().unwrap().status,
            OfferStatus::Cancelled
        );
        assert_eq!(
            f.offers.get(loser_b.id).await.unwrap().unwrap().status,
            OfferStatus::Cancelled
        );

        // The losers can't be resolved any more.
        let err = f
            .service
            .resolve(
                loser_a.id,
                OfferDecision::Accept,
                ResolveAuthority::Holder(booking.holder_id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyResolved));
    }

    #[tokio::test]
    async fn operator_can_resolve_without_ownership() {
        let f = fixture().await;
        let offer = f
            .service
            .submit(offer_req(&f.booking, "buyer@example.com", 10_000))
            .await
            .unwrap();
        let outcome = f
            .service
            .resolve(
                offer.id,
                OfferDecision::Reject,
                ResolveAuthority::Operator("ops@gridlot".into()),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, ResolveOutcome::Rejected(_)));

        // The override left a trail.
        let entries = f.store.audit_entries();
        assert!(entries
            .iter()
            .any(|e| e.action == "offer.resolve" && e.actor.starts_with("operator:")));
    }
}
