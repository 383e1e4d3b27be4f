use chrono::{Duration, Utc};
use gridlot_booking::memory::MemoryBookingStore;
use gridlot_booking::{
    ActivationService, BookingFilter, BookingStatus, BookingSweeper, ReservationRequest,
    ReservationService, SlotCreative,
};
use gridlot_catalog::memory::MemoryTierConfigStore;
use gridlot_catalog::Tier;
use gridlot_core::identity::HolderInfo;
use gridlot_core::notify::LogNotifier;
use gridlot_core::payment::{MockPaymentGateway, PaymentEvent};
use gridlot_core::CoreError;
use gridlot_shared::SlotCoord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use gridlot_booking::BookingRepository;

/// Random interleavings of reserve / activate / refund-cancel / expire over
/// a handful of slots must never leave two overlapping active bookings on
/// the same slot.
#[tokio::test]
async fn interleavings_never_double_book_a_slot() {
    for seed in 0..8u64 {
        run_interleaving(seed).await;
    }
}

async fn run_interleaving(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let store = Arc::new(MemoryBookingStore::new());
    let tiers = Arc::new(MemoryTierConfigStore::with_defaults());
    let reservations = ReservationService::new(
        store.clone(),
        tiers,
        store.clone(),
        Arc::new(MockPaymentGateway),
    );
    let activation = ActivationService::new(store.clone(), store.clone(), Arc::new(LogNotifier));
    let sweeper = BookingSweeper::new(store.clone(), store.clone(), Arc::new(LogNotifier), 72);

    let slots = [(18, 18), (0, 0), (18, 20), (10, 10)];
    let mut open_sessions: Vec<String> = Vec::new();
    let mut charges: Vec<String> = Vec::new();
    let mut clock = Utc::now();

    for step in 0..200 {
        match rng.gen_range(0..5) {
            // Reserve a random slot for a random duration
            0 | 1 => {
                let (x, y) = slots[rng.gen_range(0..slots.len())];
                let slot = SlotCoord::new(x, y).unwrap();
                let req = ReservationRequest {
                    x,
                    y,
                    tier: Tier::of(slot),
                    duration_days: rng.gen_range(1..20),
                    holder: HolderInfo {
                        email: format!("buyer{}@example.com", rng.gen_range(0..4)),
                        display_name: None,
                    },
                    creative: SlotCreative {
                        display_name: format!("step-{}", step),
                        target_url: "https://example.invalid".into(),
                        tagline: None,
                        image_url: None,
                    },
                    boost: false,
                };
                match reservations.create(req).await {
                    Ok(out) => {
                        open_sessions.push(out.booking.payment_session_ref.unwrap());
                    }
                    Err(CoreError::SlotConflict) => {}
                    Err(other) => panic!("unexpected reservation failure: {other}"),
                }
            }
            // Confirm a random outstanding payment session
            2 => {
                if !open_sessions.is_empty() {
                    let session = open_sessions.swap_remove(rng.gen_range(0..open_sessions.len()));
                    let charge = format!("ch_{}", step);
                    activation
                        .apply(PaymentEvent::SessionCompleted {
                            session_ref: session,
                            charge_ref: charge.clone(),
                            customer_ref: None,
                        })
                        .await
                        .unwrap();
                    charges.push(charge);
                }
            }
            // Refund a random charge
            3 => {
                if !charges.is_empty() {
                    let charge = charges.swap_remove(rng.gen_range(0..charges.len()));
                    activation
                        .apply(PaymentEvent::ChargeRefunded { charge_ref: charge })
                        .await
                        .unwrap();
                }
            }
            // Advance simulated time and sweep
            _ => {
                clock += Duration::days(rng.gen_range(0..6));
                sweeper.sweep(clock).await.unwrap();
            }
        }

        assert_no_overlapping_active(&store).await;
    }
}

async fn assert_no_overlapping_active(store: &MemoryBookingStore) {
    let active = store
        .list(&BookingFilter {
            status: Some(BookingStatus::Active),
            ..Default::default()
        })
        .await
        .unwrap();
    for (i, a) in active.iter().enumerate() {
        for b in active.iter().skip(i + 1) {
            if a.slot == b.slot {
                assert!(
                    !a.overlaps(b.start_date, b.end_date),
                    "slot {} has overlapping active bookings {} and {}",
                    a.slot,
                    a.id,
                    b.id
                );
            }
        }
    }
}
