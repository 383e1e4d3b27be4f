use crate::repository::BookingRepository;
use chrono::{DateTime, Duration, Utc};
use gridlot_core::error::CoreError;
use gridlot_core::identity::HolderRepository;
use gridlot_core::notify::{NotificationKind, Notifier};
use std::sync::Arc;

/// Outcome of one reminder pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderReport {
    pub reminders_sent: u64,
    pub notices_sent: u64,
}

/// Scheduled booking maintenance. Both passes are idempotent: the sweep is
/// one conditional bulk update, and the reminder pass flips a sent-flag per
/// booking so redelivery cannot double-notify.
pub struct BookingSweeper {
    bookings: Arc<dyn BookingRepository>,
    holders: Arc<dyn HolderRepository>,
    notifier: Arc<dyn Notifier>,
    reminder_window: Duration,
}

impl BookingSweeper {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        holders: Arc<dyn HolderRepository>,
        notifier: Arc<dyn Notifier>,
        reminder_window_hours: i64,
    ) -> Self {
        Self {
            bookings,
            holders,
            notifier,
            reminder_window: Duration::hours(reminder_window_hours),
        }
    }

    /// ACTIVE bookings past their deadline become EXPIRED. `expires_at`
    /// governs when present; date-era bookings fall back to `end_date`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, CoreError> {
        let expired = self
            .bookings
            .expire_due(now)
            .await
            .map_err(CoreError::store)?;
        if expired > 0 {
            tracing::info!(expired, "booking expiry sweep");
        }
        Ok(expired)
    }

    /// Pre-expiry reminders and post-expiry notices, at most once per
    /// booking. The flag is flipped only after a successful notify, so a
    /// failed delivery is retried on the next pass.
    pub async fn remind(&self, now: DateTime<Utc>) -> Result<ReminderReport, CoreError> {
        let mut report = ReminderReport::default();

        let ending_soon = self
            .bookings
            .due_reminders(now + self.reminder_window)
            .await
            .map_err(CoreError::store)?;
        for booking in ending_soon {
            if self
                .notify_holder(&booking, NotificationKind::ExpiryReminder)
                .await
            {
                if self
                    .bookings
                    .mark_reminder_sent(booking.id)
                    .await
                    .map_err(CoreError::store)?
                {
                    report.reminders_sent += 1;
                }
            }
        }

        let just_expired = self
            .bookings
            .expired_unnotified()
            .await
            .map_err(CoreError::store)?;
        for booking in just_expired {
            if self
                .notify_holder(&booking, NotificationKind::ExpiryNotice)
                .await
            {
                if self
                    .bookings
                    .mark_expiry_notified(booking.id)
                    .await
                    .map_err(CoreError::store)?
                {
                    report.notices_sent += 1;
                }
            }
        }

        Ok(report)
    }

    async fn notify_holder(&self, booking: &crate::models::Booking, kind: NotificationKind) -> bool {
        let holder = match self.holders.find(booking.holder_id).await {
            Ok(Some(h)) => h,
            Ok(None) => return false,
            Err(err) => {
                tracing::error!(booking = %booking.id, error = %err, "holder lookup failed");
                return false;
            }
        };
        let data = serde_json::json!({
            "slot": booking.slot.to_string(),
            "end_date": booking.end_date,
            "expires_at": booking.expires_at,
        });
        match self.notifier.notify(kind, &holder.email, data).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(booking = %booking.id, kind = %kind, error = %err, "notify failed");
                false
            }
        }
    }
}
