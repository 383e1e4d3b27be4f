use gridlot_shared::{SlotCoord, GRID_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Center coordinate on both axes.
pub const GRID_CENTER: i32 = 18;

/// The four fixed corner slots. Corner membership takes priority over the
/// distance rings.
const CORNERS: [(i32, i32); 4] = [
    (0, 0),
    (0, GRID_SIZE - 1),
    (GRID_SIZE - 1, 0),
    (GRID_SIZE - 1, GRID_SIZE - 1),
];

/// Pricing class of a slot. Names reflect the cardinality class of each
/// ring, not the price: the grid partitions into exactly 1 One, 48 Ten,
/// 4 CornerTen, 576 Hundred and 740 Viral slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    One,
    Ten,
    CornerTen,
    Hundred,
    Viral,
}

impl Tier {
    /// Assign a tier to a slot. Pure and deterministic; availability is a
    /// separate TierConfig read.
    pub fn of(slot: SlotCoord) -> Tier {
        if CORNERS.contains(&(slot.x, slot.y)) {
            return Tier::CornerTen;
        }
        let d = (slot.x - GRID_CENTER).abs().max((slot.y - GRID_CENTER).abs());
        match d {
            0 => Tier::One,
            1..=3 => Tier::Ten,
            4..=11 => Tier::Hundred,
            _ => Tier::Viral,
        }
    }

    pub fn all() -> [Tier; 5] {
        [
            Tier::One,
            Tier::Ten,
            Tier::CornerTen,
            Tier::Hundred,
            Tier::Viral,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::One => "one",
            Tier::Ten => "ten",
            Tier::CornerTen => "corner_ten",
            Tier::Hundred => "hundred",
            Tier::Viral => "viral",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one" => Ok(Tier::One),
            "ten" => Ok(Tier::Ten),
            "corner_ten" => Ok(Tier::CornerTen),
            "hundred" => Ok(Tier::Hundred),
            "viral" => Ok(Tier::Viral),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partitions_the_full_grid() {
        let mut counts: HashMap<Tier, usize> = HashMap::new();
        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                let tier = Tier::of(SlotCoord::new(x, y).unwrap());
                *counts.entry(tier).or_default() += 1;
            }
        }
        assert_eq!(counts[&Tier::One], 1);
        assert_eq!(counts[&Tier::Ten], 48);
        assert_eq!(counts[&Tier::CornerTen], 4);
        assert_eq!(counts[&Tier::Hundred], 576);
        assert_eq!(counts[&Tier::Viral], 740);
        assert_eq!(counts.values().sum::<usize>(), 1369);
    }

    #[test]
    fn corners_beat_distance() {
        // By distance alone every corner would land in Viral.
        for (x, y) in [(0, 0), (0, 36), (36, 0), (36, 36)] {
            assert_eq!(Tier::of(SlotCoord::new(x, y).unwrap()), Tier::CornerTen);
        }
    }

    #[test]
    fn ring_boundaries() {
        let at = |x, y| Tier::of(SlotCoord::new(x, y).unwrap());
        assert_eq!(at(18, 18), Tier::One);
        assert_eq!(at(18, 21), Tier::Ten); // d = 3
        assert_eq!(at(18, 22), Tier::Hundred); // d = 4
        assert_eq!(at(7, 18), Tier::Hundred); // d = 11
        assert_eq!(at(6, 18), Tier::Viral); // d = 12
    }

    #[test]
    fn tier_ids_round_trip() {
        for tier in Tier::all() {
            assert_eq!(tier.as_str().parse::<Tier>().unwrap(), tier);
        }
        assert!("platinum".parse::<Tier>().is_err());
    }
}
