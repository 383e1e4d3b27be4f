use crate::models::Booking;
use crate::repository::BookingRepository;
use gridlot_core::error::CoreError;
use gridlot_core::identity::HolderRepository;
use gridlot_core::notify::{NotificationKind, Notifier};
use gridlot_core::payment::PaymentEvent;
use std::sync::Arc;

/// Result of applying a payment event. A `NoOp` means the event matched
/// zero rows — duplicate delivery or unknown reference — and is success at
/// the protocol level.
#[derive(Debug, Clone)]
pub enum ActivationOutcome {
    Applied(Booking),
    NoOp,
}

impl ActivationOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, ActivationOutcome::Applied(_))
    }
}

/// Consumes payment collaborator events and advances bookings. All three
/// transitions are status-guarded updates, so at-least-once webhook
/// delivery is safe: the second delivery of the same event matches nothing.
pub struct ActivationService {
    bookings: Arc<dyn BookingRepository>,
    holders: Arc<dyn HolderRepository>,
    notifier: Arc<dyn Notifier>,
}

impl ActivationService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        holders: Arc<dyn HolderRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            bookings,
            holders,
            notifier,
        }
    }

    pub async fn apply(&self, event: PaymentEvent) -> Result<ActivationOutcome, CoreError> {
        match event {
            PaymentEvent::SessionCompleted {
                session_ref,
                charge_ref,
                ..
            } => {
                let updated = self
                    .bookings
                    .activate_by_session(&session_ref, &charge_ref)
                    .await
                    .map_err(CoreError::store)?;
                match updated {
                    Some(booking) => {
                        tracing::info!(booking = %booking.id, slot = %booking.slot, "booking activated");
                        self.send_confirmation(&booking).await;
                        Ok(ActivationOutcome::Applied(booking))
                    }
                    None => {
                        tracing::debug!(session = %session_ref, "session completion matched no pending booking");
                        Ok(ActivationOutcome::NoOp)
                    }
                }
            }
            PaymentEvent::SessionExpired { session_ref } => {
                let updated = self
                    .bookings
                    .cancel_by_session(&session_ref)
                    .await
                    .map_err(CoreError::store)?;
                match updated {
                    Some(booking) => {
                        tracing::info!(booking = %booking.id, "pending booking cancelled, checkout expired");
                        Ok(ActivationOutcome::Applied(booking))
                    }
                    None => Ok(ActivationOutcome::NoOp),
                }
            }
            PaymentEvent::ChargeRefunded { charge_ref } => {
                let updated = self
                    .bookings
                    .cancel_by_charge(&charge_ref)
                    .await
                    .map_err(CoreError::store)?;
                match updated {
                    Some(booking) => {
                        tracing::info!(booking = %booking.id, "active booking cancelled after refund");
                        Ok(ActivationOutcome::Applied(booking))
                    }
                    None => Ok(ActivationOutcome::NoOp),
                }
            }
        }
    }

    /// Best-effort; a notification failure never rolls back the activation.
    async fn send_confirmation(&self, booking: &Booking) {
        let holder = match self.holders.find(booking.holder_id).await {
            Ok(Some(h)) => h,
            Ok(None) => return,
            Err(err) => {
                tracing::error!(booking = %booking.id, error = %err, "holder lookup failed for confirmation");
                return;
            }
        };
        let data = serde_json::json!({
            "slot": booking.slot.to_string(),
            "tier": booking.tier.as_str(),
            "start_date": booking.start_date,
            "end_date": booking.end_date,
            "amount_cents": booking.amount_cents,
        });
        if let Err(err) = self
            .notifier
            .notify(NotificationKind::PaymentConfirmed, &holder.email, data)
            .await
        {
            tracing::error!(booking = %booking.id, error = %err, "payment confirmation notify failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBookingStore;
    use crate::models::BookingStatus;
    use crate::reservation::{ReservationRequest, ReservationService};
    use gridlot_catalog::memory::MemoryTierConfigStore;
    use gridlot_catalog::Tier;
    use gridlot_core::identity::HolderInfo;
    use gridlot_core::notify::LogNotifier;
    use gridlot_core::payment::MockPaymentGateway;
    use gridlot_shared::SlotCoord;

    async fn pending_booking(store: &Arc<MemoryBookingStore>) -> Booking {
        let svc = ReservationService::new(
            store.clone(),
            Arc::new(MemoryTierConfigStore::with_defaults()),
            store.clone(),
            Arc::new(MockPaymentGateway),
        );
        svc.create(ReservationRequest {
            x: 18,
            y: 18,
            tier: Tier::One,
            duration_days: 5,
            holder: HolderInfo {
                email: "holder@example.com".into(),
                display_name: None,
            },
            creative: crate::models::SlotCreative {
                display_name: "Acme".into(),
                target_url: "https://acme.example".into(),
                tagline: None,
                image_url: None,
            },
            boost: false,
        })
        .await
        .unwrap()
        .booking
    }

    fn activation(store: &Arc<MemoryBookingStore>) -> ActivationService {
        ActivationService::new(store.clone(), store.clone(), Arc::new(LogNotifier))
    }

    #[tokio::test]
    async fn duplicate_completion_is_a_noop() {
        let store = Arc::new(MemoryBookingStore::new());
        let booking = pending_booking(&store).await;
        let session = booking.payment_session_ref.clone().unwrap();
        let svc = activation(&store);

        let first = svc
            .apply(PaymentEvent::SessionCompleted {
                session_ref: session.clone(),
                charge_ref: "ch_1".into(),
                customer_ref: None,
            })
            .await
            .unwrap();
        assert!(first.applied());

        let second = svc
            .apply(PaymentEvent::SessionCompleted {
                session_ref: session,
                charge_ref: "ch_1".into(),
                customer_ref: None,
            })
            .await
            .unwrap();
        assert!(!second.applied());

        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Active);
        assert_eq!(stored.payment_charge_ref.as_deref(), Some("ch_1"));
    }

    #[tokio::test]
    async fn session_expiry_cancels_only_pending() {
        let store = Arc::new(MemoryBookingStore::new());
        let booking = pending_booking(&store).await;
        let session = booking.payment_session_ref.clone().unwrap();
        let svc = activation(&store);

        svc.apply(PaymentEvent::SessionCompleted {
            session_ref: session.clone(),
            charge_ref: "ch_2".into(),
            customer_ref: None,
        })
        .await
        .unwrap();

        // Booking is active now; a late session-expired event must not touch it.
        let out = svc
            .apply(PaymentEvent::SessionExpired {
                session_ref: session,
            })
            .await
            .unwrap();
        assert!(!out.applied());
        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Active);
    }

    #[tokio::test]
    async fn refund_cancels_active_booking() {
        let store = Arc::new(MemoryBookingStore::new());
        let booking = pending_booking(&store).await;
        let session = booking.payment_session_ref.clone().unwrap();
        let svc = activation(&store);

        svc.apply(PaymentEvent::SessionCompleted {
            session_ref: session,
            charge_ref: "ch_3".into(),
            customer_ref: None,
        })
        .await
        .unwrap();

        let out = svc
            .apply(PaymentEvent::ChargeRefunded {
                charge_ref: "ch_3".into(),
            })
            .await
            .unwrap();
        assert!(out.applied());
        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        // Slot frees up for a fresh reservation
        assert!(store
            .active_on_slot(SlotCoord::new(18, 18).unwrap())
            .await
            .unwrap()
            .is_none());
    }
}
