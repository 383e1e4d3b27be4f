use chrono::{DateTime, Duration, Utc};
use gridlot_shared::SlotCoord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Hard decision deadline for the slot holder, fixed at offer creation.
pub const OFFER_TTL_HOURS: i64 = 72;

/// Buyout offer status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Cancelled,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::Expired => "EXPIRED",
            OfferStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OfferStatus::Pending),
            "ACCEPTED" => Ok(OfferStatus::Accepted),
            "REJECTED" => Ok(OfferStatus::Rejected),
            "EXPIRED" => Ok(OfferStatus::Expired),
            "CANCELLED" => Ok(OfferStatus::Cancelled),
            other => Err(format!("unknown offer status: {}", other)),
        }
    }
}

/// A third party's proposal to take over an active booking's slot before
/// its natural expiration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyoutOffer {
    pub id: Uuid,
    pub slot: SlotCoord,
    pub booking_id: Uuid,
    pub buyer_email: String,
    pub buyer_name: Option<String>,
    pub amount_cents: i64,
    pub message: Option<String>,
    pub status: OfferStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BuyoutOffer {
    pub fn new(
        slot: SlotCoord,
        booking_id: Uuid,
        buyer_email: String,
        buyer_name: Option<String>,
        amount_cents: i64,
        message: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            slot,
            booking_id,
            buyer_email,
            buyer_name,
            amount_cents,
            message,
            status: OfferStatus::Pending,
            expires_at: now + Duration::hours(OFFER_TTL_HOURS),
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending and inside the decision window. Expired-but-unswept offers
    /// count as closed here even before the sweeper catches up.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Pending && self.expires_at > now
    }
}
