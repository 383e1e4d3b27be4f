use crate::models::{Booking, BookingStatus, SlotCreative};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use gridlot_catalog::Tier;
use gridlot_shared::SlotCoord;
use uuid::Uuid;

/// Operator/read-side listing filter.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub tier: Option<Tier>,
    pub slot: Option<SlotCoord>,
    /// Case-insensitive match over creative display name.
    pub search: Option<String>,
    /// Only bookings whose `[start,end)` overlaps this window.
    pub overlaps: Option<(NaiveDate, NaiveDate)>,
    pub limit: i64,
}

/// Repository trait for booking data access.
///
/// Every state transition here is a conditional update: the WHERE clause
/// carries the expected current status, so a duplicate delivery or a
/// concurrent competing writer matches zero rows instead of clobbering
/// state. `None`/`false`/`0` returns are the idempotent no-op signal.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// Pending/active bookings on the slot whose window overlaps
    /// `[start, end)`. The reservation path treats any hit as a conflict.
    async fn find_overlapping(
        &self,
        slot: SlotCoord,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// The single active booking on a slot, if any.
    async fn active_on_slot(
        &self,
        slot: SlotCoord,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// PENDING → ACTIVE keyed by payment session, storing the charge ref.
    /// Returns the updated booking, or None when no pending booking matches
    /// the session (duplicate webhook delivery, or unknown session).
    async fn activate_by_session(
        &self,
        session_ref: &str,
        charge_ref: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// PENDING → CANCELLED keyed by payment session (checkout abandoned).
    async fn cancel_by_session(
        &self,
        session_ref: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// ACTIVE → CANCELLED keyed by charge ref (refund issued).
    async fn cancel_by_charge(
        &self,
        charge_ref: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// Bulk sweep: ACTIVE bookings past their deadline become EXPIRED.
    /// `expires_at` governs when present, `end_date` otherwise. Returns
    /// rows affected; re-running with the same inputs affects zero rows.
    async fn expire_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;

    /// Active, unreminded bookings whose deadline falls before
    /// `window_end`.
    async fn due_reminders(
        &self,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn mark_reminder_sent(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Expired bookings whose holder has not been notified yet.
    async fn expired_unnotified(
        &self,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn mark_expiry_notified(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Buyout transfer: reassign holder and creative content, preserving
    /// the occupancy window. Conditional on the booking still being ACTIVE
    /// and still held by `from_holder`; this predicate is the single-winner
    /// guard between competing accepts and the expiry sweep.
    async fn transfer_holder(
        &self,
        id: Uuid,
        from_holder: Uuid,
        to_holder: Uuid,
        creative: &SlotCreative,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn list(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    // ------------------------------------------------------------------
    // Operator channel. These bypass the normal trigger path but write an
    // audit entry in the same transaction as the mutation.
    // ------------------------------------------------------------------

    /// Any status → CANCELLED.
    async fn admin_cancel(
        &self,
        id: Uuid,
        actor: &str,
        reason: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// PENDING → ACTIVE without a payment confirmation (manually settled).
    async fn admin_force_activate(
        &self,
        id: Uuid,
        actor: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// Push `end_date` (and `expires_at` when set) forward by
    /// `extra_days`; status untouched.
    async fn admin_extend(
        &self,
        id: Uuid,
        extra_days: i64,
        actor: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;
}
