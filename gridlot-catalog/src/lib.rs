pub mod config;
pub mod memory;
pub mod repository;
pub mod tier;

pub use config::TierConfig;
pub use repository::TierConfigRepository;
pub use tier::{Tier, GRID_CENTER};
