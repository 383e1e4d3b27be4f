use serde::{Deserialize, Serialize};

/// Fund split recorded when a buyout is accepted. The buyer is charged the
/// full offer through the payment collaborator; this core only computes and
/// records the ledger amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub residual_value_cents: i64,
    pub holder_payout_cents: i64,
    pub platform_fee_cents: i64,
    pub buyer_charge_cents: i64,
}

/// Round-half-up percentage of an amount in cents.
fn share(cents: i64, pct: i64) -> i64 {
    (cents * pct + 50) / 100
}

/// Settlement for an accepted buyout. The holder is made whole for 70% of
/// the unconsumed booking value and keeps 30% of the offer; the platform
/// takes a 20% commission on the offer.
pub fn settle(remaining_days: i64, daily_rate_cents: i64, offer_cents: i64) -> Settlement {
    let residual = remaining_days.max(0) * daily_rate_cents;
    Settlement {
        residual_value_cents: residual,
        holder_payout_cents: share(residual, 70) + share(offer_cents, 30),
        platform_fee_cents: share(offer_cents, 20),
        buyer_charge_cents: offer_cents,
    }
}
