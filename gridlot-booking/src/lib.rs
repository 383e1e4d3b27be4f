pub mod activation;
pub mod expiry;
pub mod memory;
pub mod models;
pub mod repository;
pub mod reservation;

pub use activation::{ActivationOutcome, ActivationService};
pub use expiry::BookingSweeper;
pub use models::{Booking, BookingStatus, SlotCreative};
pub use repository::{BookingFilter, BookingRepository};
pub use reservation::{ReservationOutcome, ReservationRequest, ReservationService};
