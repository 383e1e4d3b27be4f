use chrono::{DateTime, NaiveDate, Utc};
use gridlot_catalog::Tier;
use gridlot_shared::SlotCoord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Active,
    Expired,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Active => "ACTIVE",
            BookingStatus::Expired => "EXPIRED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "ACTIVE" => Ok(BookingStatus::Active),
            "EXPIRED" => Ok(BookingStatus::Expired),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// Holder-supplied display content. Opaque to the lifecycle engine; it is
/// carried, never interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotCreative {
    pub display_name: String,
    pub target_url: String,
    pub tagline: Option<String>,
    pub image_url: Option<String>,
}

/// A time-boxed occupancy right over one slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub slot: SlotCoord,
    /// Denormalized at creation so later tier-map changes don't reprice
    /// running bookings.
    pub tier: Tier,
    pub holder_id: Uuid,
    pub status: BookingStatus,
    /// Half-open occupancy window `[start_date, end_date)`.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Second-granularity deadline. When set it supersedes `end_date`;
    /// older bookings predate this field and only carry the date.
    pub expires_at: Option<DateTime<Utc>>,
    pub amount_cents: i64,
    pub payment_session_ref: Option<String>,
    pub payment_charge_ref: Option<String>,
    pub creative: SlotCreative,
    pub boost: bool,
    pub reminder_sent: bool,
    pub expiry_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Interval overlap against another half-open `[start, end)` window.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date < end && start < self.end_date
    }

    /// Days of occupancy left, never negative. Drives residual value in
    /// buyout settlement.
    pub fn remaining_days(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days().max(0)
    }

    /// The effective deadline: `expires_at` wins when present, otherwise
    /// the end of the last booked day.
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at <= now,
            None => self.end_date <= now.date_naive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn booking(start: NaiveDate, end: NaiveDate) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            slot: SlotCoord::new(3, 3).unwrap(),
            tier: Tier::Viral,
            holder_id: Uuid::new_v4(),
            status: BookingStatus::Active,
            start_date: start,
            end_date: end,
            expires_at: None,
            amount_cents: 1000,
            payment_session_ref: None,
            payment_charge_ref: None,
            creative: SlotCreative {
                display_name: "acme".into(),
                target_url: "https://acme.example".into(),
                tagline: None,
                image_url: None,
            },
            boost: false,
            reminder_sent: false,
            expiry_notified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn half_open_overlap() {
        let b = booking(d("2026-08-01"), d("2026-08-11"));
        assert!(b.overlaps(d("2026-08-10"), d("2026-08-12")));
        assert!(b.overlaps(d("2026-07-20"), d("2026-08-02")));
        // End date is exclusive: a window starting exactly at end_date is free.
        assert!(!b.overlaps(d("2026-08-11"), d("2026-08-20")));
        assert!(!b.overlaps(d("2026-07-01"), d("2026-08-01")));
    }

    #[test]
    fn precise_deadline_supersedes_end_date() {
        let now = Utc::now();
        let mut b = booking(now.date_naive() - Duration::days(30), now.date_naive() - Duration::days(1));
        // Date-era booking, end date in the past: due.
        assert!(b.is_past_deadline(now));
        // Same booking with a future precise deadline: not due.
        b.expires_at = Some(now + Duration::hours(6));
        assert!(!b.is_past_deadline(now));
        // Past precise deadline: due regardless of dates.
        b.expires_at = Some(now - Duration::seconds(1));
        assert!(b.is_past_deadline(now));
    }

    #[test]
    fn remaining_days_clamps_at_zero() {
        let b = booking(d("2026-08-01"), d("2026-08-11"));
        assert_eq!(b.remaining_days(d("2026-08-01")), 10);
        assert_eq!(b.remaining_days(d("2026-08-09")), 2);
        assert_eq!(b.remaining_days(d("2026-09-01")), 0);
    }
}
