pub mod expiry;
pub mod memory;
pub mod models;
pub mod negotiation;
pub mod repository;
pub mod settlement;

pub use expiry::OfferSweeper;
pub use models::{BuyoutOffer, OfferStatus, OFFER_TTL_HOURS};
pub use negotiation::{
    NegotiationService, OfferDecision, OfferRequest, ResolveAuthority, ResolveOutcome,
};
pub use repository::{OfferFilter, OfferRepository};
pub use settlement::{settle, Settlement};
