use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-tier business configuration. One row per tier, mutated only through
/// the operator channel and read fresh on every reservation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub tier: Tier,
    pub is_available: bool,
    pub price_per_day_cents: i64,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TierConfig {
    fn seed(tier: Tier, price_per_day_cents: i64) -> Self {
        Self {
            tier,
            is_available: true,
            price_per_day_cents,
            updated_by: None,
            updated_at: None,
        }
    }

    /// Launch defaults. Operators adjust the live rows afterwards.
    pub fn defaults() -> Vec<TierConfig> {
        vec![
            TierConfig::seed(Tier::One, 5000),
            TierConfig::seed(Tier::Ten, 2500),
            TierConfig::seed(Tier::CornerTen, 2500),
            TierConfig::seed(Tier::Hundred, 1000),
            TierConfig::seed(Tier::Viral, 250),
        ]
    }
}
