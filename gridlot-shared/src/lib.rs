pub mod pii;
pub mod slot;

pub use slot::{SlotCoord, SlotError, GRID_SIZE};
