pub mod audit;
pub mod error;
pub mod identity;
pub mod notify;
pub mod payment;

pub use audit::{AuditLogEntry, AuditLogRepository};
pub use error::CoreError;
pub use identity::{Holder, HolderInfo, HolderRepository};
pub use notify::{NotificationKind, Notifier};
pub use payment::{CheckoutRequest, CheckoutSession, PaymentEvent, PaymentGateway};
