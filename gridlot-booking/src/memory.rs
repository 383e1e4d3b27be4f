use crate::models::{Booking, BookingStatus, SlotCreative};
use crate::repository::{BookingFilter, BookingRepository};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use gridlot_core::audit::{AuditLogEntry, AuditLogRepository};
use gridlot_core::identity::{Holder, HolderInfo, HolderRepository};
use gridlot_shared::SlotCoord;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// HashMap-backed store used in development mode and by service tests.
/// Mirrors the conditional-update semantics of the Postgres repository:
/// a transition only applies when the current status matches.
#[derive(Default)]
pub struct MemoryBookingStore {
    bookings: Mutex<HashMap<Uuid, Booking>>,
    holders: Mutex<Vec<Holder>>,
    audit: Mutex<Vec<AuditLogEntry>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.audit
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    fn lock_bookings(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Booking>>, String> {
        self.bookings
            .lock()
            .map_err(|_| "booking store lock poisoned".to_string())
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingStore {
    async fn insert(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        rows.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.lock_bookings()?.get(&id).cloned())
    }

    async fn find_overlapping(
        &self,
        slot: SlotCoord,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = self.lock_bookings()?;
        Ok(rows
            .values()
            .filter(|b| {
                b.slot == slot
                    && matches!(b.status, BookingStatus::Pending | BookingStatus::Active)
                    && b.overlaps(start, end)
            })
            .cloned()
            .collect())
    }

    async fn active_on_slot(
        &self,
        slot: SlotCoord,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = self.lock_bookings()?;
        Ok(rows
            .values()
            .find(|b| b.slot == slot && b.status == BookingStatus::Active)
            .cloned())
    }

    async fn activate_by_session(
        &self,
        session_ref: &str,
        charge_ref: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        let hit = rows.values_mut().find(|b| {
            b.payment_session_ref.as_deref() == Some(session_ref)
                && b.status == BookingStatus::Pending
        });
        Ok(hit.map(|b| {
            b.status = BookingStatus::Active;
            b.payment_charge_ref = Some(charge_ref.to_string());
            b.updated_at = Utc::now();
            b.clone()
        }))
    }

    async fn cancel_by_session(
        &self,
        session_ref: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        let hit = rows.values_mut().find(|b| {
            b.payment_session_ref.as_deref() == Some(session_ref)
                && b.status == BookingStatus::Pending
        });
        Ok(hit.map(|b| {
            b.status = BookingStatus::Cancelled;
            b.updated_at = Utc::now();
            b.clone()
        }))
    }

    async fn cancel_by_charge(
        &self,
        charge_ref: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        let hit = rows.values_mut().find(|b| {
            b.payment_charge_ref.as_deref() == Some(charge_ref)
                && b.status == BookingStatus::Active
        });
        Ok(hit.map(|b| {
            b.status = BookingStatus::Cancelled;
            b.updated_at = Utc::now();
            b.clone()
        }))
    }

    async fn expire_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        let mut affected = 0;
        for b in rows.values_mut() {
            if b.status == BookingStatus::Active && b.is_past_deadline(now) {
                b.status = BookingStatus::Expired;
                b.updated_at = now;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn due_reminders(
        &self,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = self.lock_bookings()?;
        Ok(rows
            .values()
            .filter(|b| {
                b.status == BookingStatus::Active
                    && !b.reminder_sent
                    && b.is_past_deadline(window_end)
            })
            .cloned()
            .collect())
    }

    async fn mark_reminder_sent(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        match rows.get_mut(&id) {
            Some(b) if !b.reminder_sent => {
                b.reminder_sent = true;
                b.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expired_unnotified(
        &self,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = self.lock_bookings()?;
        Ok(rows
            .values()
            .filter(|b| b.status == BookingStatus::Expired && !b.expiry_notified)
            .cloned()
            .collect())
    }

    async fn mark_expiry_notified(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        match rows.get_mut(&id) {
            Some(b) if !b.expiry_notified => {
                b.expiry_notified = true;
                b.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transfer_holder(
        &self,
        id: Uuid,
        from_holder: Uuid,
        to_holder: Uuid,
        creative: &SlotCreative,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        match rows.get_mut(&id) {
            Some(b) if b.status == BookingStatus::Active && b.holder_id == from_holder => {
                b.holder_id = to_holder;
                b.creative = creative.clone();
                b.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = self.lock_bookings()?;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut hits: Vec<Booking> = rows
            .values()
            .filter(|b| {
                filter.status.map_or(true, |s| b.status == s)
                    && filter.tier.map_or(true, |t| b.tier == t)
                    && filter.slot.map_or(true, |s| b.slot == s)
                    && needle.as_ref().map_or(true, |n| {
                        b.creative.display_name.to_lowercase().contains(n)
                    })
                    && filter
                        .overlaps
                        .map_or(true, |(start, end)| b.overlaps(start, end))
            })
            .cloned()
            .collect();
        hits.sort_by_key(|b| std::cmp::Reverse(b.created_at));
        if filter.limit > 0 {
            hits.truncate(filter.limit as usize);
        }
        Ok(hits)
    }

    async fn admin_cancel(
        &self,
        id: Uuid,
        actor: &str,
        reason: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        let updated = rows.get_mut(&id).map(|b| {
            b.status = BookingStatus::Cancelled;
            b.updated_at = Utc::now();
            b.clone()
        });
        if let Some(b) = &updated {
            self.audit
                .lock()
                .map_err(|_| "audit lock poisoned".to_string())?
                .push(AuditLogEntry::new(
                    actor,
                    "booking.cancel",
                    "booking",
                    b.id,
                    serde_json::json!({ "reason": reason }),
                ));
        }
        Ok(updated)
    }

    async fn admin_force_activate(
        &self,
        id: Uuid,
        actor: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        let updated = match rows.get_mut(&id) {
            Some(b) if b.status == BookingStatus::Pending => {
                b.status = BookingStatus::Active;
                b.updated_at = Utc::now();
                Some(b.clone())
            }
            _ => None,
        };
        if let Some(b) = &updated {
            self.audit
                .lock()
                .map_err(|_| "audit lock poisoned".to_string())?
                .push(AuditLogEntry::new(
                    actor,
                    "booking.force_activate",
                    "booking",
                    b.id,
                    serde_json::json!({}),
                ));
        }
        Ok(updated)
    }

    async fn admin_extend(
        &self,
        id: Uuid,
        extra_days: i64,
        actor: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.lock_bookings()?;
        let updated = rows.get_mut(&id).map(|b| {
            b.end_date = b.end_date + Duration::days(extra_days);
            b.expires_at = b.expires_at.map(|at| at + Duration::days(extra_days));
            b.updated_at = Utc::now();
            b.clone()
        });
        if let Some(b) = &updated {
            self.audit
                .lock()
                .map_err(|_| "audit lock poisoned".to_string())?
                .push(AuditLogEntry::new(
                    actor,
                    "booking.extend",
                    "booking",
                    b.id,
                    serde_json::json!({ "extra_days": extra_days }),
                ));
        }
        Ok(updated)
    }
}

#[async_trait]
impl HolderRepository for MemoryBookingStore {
    async fn upsert(
        &self,
        info: &HolderInfo,
    ) -> Result<Holder, Box<dyn std::error::Error + Send + Sync>> {
        let mut holders = self
            .holders
            .lock()
            .map_err(|_| "holder lock poisoned".to_string())?;
        if let Some(existing) = holders.iter_mut().find(|h| h.email == info.email) {
            if existing.display_name.is_none() {
                existing.display_name = info.display_name.clone();
            }
            return Ok(existing.clone());
        }
        let holder = Holder {
            id: Uuid::new_v4(),
            email: info.email.clone(),
            display_name: info.display_name.clone(),
            created_at: Utc::now(),
        };
        holders.push(holder.clone());
        Ok(holder)
    }

    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<Holder>, Box<dyn std::error::Error + Send + Sync>> {
        let holders = self
            .holders
            .lock()
            .map_err(|_| "holder lock poisoned".to_string())?;
        Ok(holders.iter().find(|h| h.id == id).cloned())
    }
}

#[async_trait]
impl AuditLogRepository for MemoryBookingStore {
    async fn append(
        &self,
        entry: &AuditLogEntry,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.audit
            .lock()
            .map_err(|_| "audit lock poisoned".to_string())?
            .push(entry.clone());
        Ok(())
    }

    async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLogEntry>, Box<dyn std::error::Error + Send + Sync>> {
        let audit = self
            .audit
            .lock()
            .map_err(|_| "audit lock poisoned".to_string())?;
        Ok(audit
            .iter()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
