use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Edge length of the grid. Coordinates run 0..GRID_SIZE on both axes.
pub const GRID_SIZE: i32 = 37;

/// One addressable cell of the grid. Slots are derived from their
/// coordinates and never persisted on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotCoord {
    pub x: i32,
    pub y: i32,
}

impl SlotCoord {
    pub fn new(x: i32, y: i32) -> Result<Self, SlotError> {
        if !(0..GRID_SIZE).contains(&x) || !(0..GRID_SIZE).contains(&y) {
            return Err(SlotError::OutOfBounds { x, y });
        }
        Ok(Self { x, y })
    }
}

impl fmt::Display for SlotCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for SlotCoord {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| SlotError::Malformed(s.to_string()))?;
        let x = x
            .trim()
            .parse()
            .map_err(|_| SlotError::Malformed(s.to_string()))?;
        let y = y
            .trim()
            .parse()
            .map_err(|_| SlotError::Malformed(s.to_string()))?;
        SlotCoord::new(x, y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("slot ({x},{y}) is outside the grid")]
    OutOfBounds { x: i32, y: i32 },

    #[error("malformed slot coordinate: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_bounds() {
        assert!(SlotCoord::new(-1, 0).is_err());
        assert!(SlotCoord::new(0, 37).is_err());
        assert!(SlotCoord::new(36, 36).is_ok());
    }

    #[test]
    fn parses_display_form() {
        let slot: SlotCoord = "18,4".parse().unwrap();
        assert_eq!(slot, SlotCoord::new(18, 4).unwrap());
        assert_eq!(slot.to_string(), "18,4");
        assert!("37,0".parse::<SlotCoord>().is_err());
        assert!("18".parse::<SlotCoord>().is_err());
    }
}
