use crate::middleware::resiliency::CircuitBreaker;
use gridlot_booking::{ActivationService, BookingRepository, ReservationService};
use gridlot_catalog::TierConfigRepository;
use gridlot_core::audit::AuditLogRepository;
use gridlot_core::identity::HolderRepository;
use gridlot_core::notify::Notifier;
use gridlot_offer::{NegotiationService, OfferRepository};
use std::sync::Arc;
use std::time::Duration;

pub struct Resiliency {
    pub payment_cb: CircuitBreaker,
}

impl Default for Resiliency {
    fn default() -> Self {
        Self {
            payment_cb: CircuitBreaker::new("payment", 5, Duration::from_secs(30)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<dyn BookingRepository>,
    pub offers: Arc<dyn OfferRepository>,
    pub tiers: Arc<dyn TierConfigRepository>,
    pub holders: Arc<dyn HolderRepository>,
    pub audit: Arc<dyn AuditLogRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub reservations: Arc<ReservationService>,
    pub activation: Arc<ActivationService>,
    pub negotiation: Arc<NegotiationService>,
    pub operator_token: String,
    pub suggested_offer_multiplier: f64,
    pub resiliency: Arc<Resiliency>,
}
