use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use gridlot_booking::models::{Booking, BookingStatus, SlotCreative};
use gridlot_booking::repository::{BookingFilter, BookingRepository};
use gridlot_core::audit::AuditLogEntry;
use gridlot_shared::SlotCoord;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub struct PostgresBookingRepository {
    pub pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLS: &str = "id, slot_x, slot_y, tier, holder_id, status, start_date, end_date, \
     expires_at, amount_cents, payment_session_ref, payment_charge_ref, display_name, \
     target_url, tagline, image_url, boost, reminder_sent, expiry_notified, created_at, updated_at";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    slot_x: i32,
    slot_y: i32,
    tier: String,
    holder_id: Uuid,
    status: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    expires_at: Option<DateTime<Utc>>,
    amount_cents: i64,
    payment_session_ref: Option<String>,
    payment_charge_ref: Option<String>,
    display_name: String,
    target_url: String,
    tagline: Option<String>,
    image_url: Option<String>,
    boost: bool,
    reminder_sent: bool,
    expiry_notified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Booking {
            id: self.id,
            slot: SlotCoord::new(self.slot_x, self.slot_y)?,
            tier: self.tier.parse()?,
            holder_id: self.holder_id,
            status: self.status.parse()?,
            start_date: self.start_date,
            end_date: self.end_date,
            expires_at: self.expires_at,
            amount_cents: self.amount_cents,
            payment_session_ref: self.payment_session_ref,
            payment_charge_ref: self.payment_charge_ref,
            creative: SlotCreative {
                display_name: self.display_name,
                target_url: self.target_url,
                tagline: self.tagline,
                image_url: self.image_url,
            },
            boost: self.boost,
            reminder_sent: self.reminder_sent,
            expiry_notified: self.expiry_notified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn rows_into_bookings(
    rows: Vec<BookingRow>,
) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
    rows.into_iter().map(BookingRow::into_booking).collect()
}

async fn append_audit_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    entry: &AuditLogEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_log (id, actor, action, target_type, target_id, detail, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(entry.id)
    .bind(&entry.actor)
    .bind(&entry.action)
    .bind(&entry.target_type)
    .bind(&entry.target_id)
    .bind(&entry.detail)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn insert(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO bookings (id, slot_x, slot_y, tier, holder_id, status, start_date, \
             end_date, expires_at, amount_cents, payment_session_ref, payment_charge_ref, \
             display_name, target_url, tagline, image_url, boost, reminder_sent, \
             expiry_notified, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)",
        )
        .bind(booking.id)
        .bind(booking.slot.x)
        .bind(booking.slot.y)
        .bind(booking.tier.as_str())
        .bind(booking.holder_id)
        .bind(booking.status.as_str())
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.expires_at)
        .bind(booking.amount_cents)
        .bind(&booking.payment_session_ref)
        .bind(&booking.payment_charge_ref)
        .bind(&booking.creative.display_name)
        .bind(&booking.creative.target_url)
        .bind(&booking.creative.tagline)
        .bind(&booking.creative.image_url)
        .bind(booking.boost)
        .bind(booking.reminder_sent)
        .bind(booking.expiry_notified)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn find_overlapping(
        &self,
        slot: SlotCoord,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings \
             WHERE slot_x = $1 AND slot_y = $2 \
               AND status IN ('PENDING', 'ACTIVE') \
               AND start_date < $4 AND $3 < end_date",
            BOOKING_COLS
        ))
        .bind(slot.x)
        .bind(slot.y)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows_into_bookings(rows)
    }

    async fn active_on_slot(
        &self,
        slot: SlotCoord,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE slot_x = $1 AND slot_y = $2 AND status = 'ACTIVE' \
             ORDER BY created_at DESC LIMIT 1",
            BOOKING_COLS
        ))
        .bind(slot.x)
        .bind(slot.y)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn activate_by_session(
        &self,
        session_ref: &str,
        charge_ref: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        // The status predicate makes duplicate webhook deliveries match
        // zero rows.
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'ACTIVE', payment_charge_ref = $2, updated_at = NOW() \
             WHERE payment_session_ref = $1 AND status = 'PENDING' \
             RETURNING {}",
            BOOKING_COLS
        ))
        .bind(session_ref)
        .bind(charge_ref)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn cancel_by_session(
        &self,
        session_ref: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'CANCELLED', updated_at = NOW() \
             WHERE payment_session_ref = $1 AND status = 'PENDING' \
             RETURNING {}",
            BOOKING_COLS
        ))
        .bind(session_ref)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn cancel_by_charge(
        &self,
        charge_ref: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'CANCELLED', updated_at = NOW() \
             WHERE payment_charge_ref = $1 AND status = 'ACTIVE' \
             RETURNING {}",
            BOOKING_COLS
        ))
        .bind(charge_ref)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn expire_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        // Single set-based update; expires_at governs when present, the
        // date-era rows fall back to end_date.
        let result = sqlx::query(
            "UPDATE bookings SET status = 'EXPIRED', updated_at = NOW() \
             WHERE status = 'ACTIVE' \
               AND ((expires_at IS NOT NULL AND expires_at <= $1) \
                 OR (expires_at IS NULL AND end_date <= $2))",
        )
        .bind(now)
        .bind(now.date_naive())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn due_reminders(
        &self,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings \
             WHERE status = 'ACTIVE' AND reminder_sent = FALSE \
               AND ((expires_at IS NOT NULL AND expires_at <= $1) \
                 OR (expires_at IS NULL AND end_date <= $2))",
            BOOKING_COLS
        ))
        .bind(window_end)
        .bind(window_end.date_naive())
        .fetch_all(&self.pool)
        .await?;
        rows_into_bookings(rows)
    }

    async fn mark_reminder_sent(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE bookings SET reminder_sent = TRUE, updated_at = NOW() \
             WHERE id = $1 AND reminder_sent = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn expired_unnotified(
        &self,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE status = 'EXPIRED' AND expiry_notified = FALSE",
            BOOKING_COLS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows_into_bookings(rows)
    }

    async fn mark_expiry_notified(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE bookings SET expiry_notified = TRUE, updated_at = NOW() \
             WHERE id = $1 AND expiry_notified = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn transfer_holder(
        &self,
        id: Uuid,
        from_holder: Uuid,
        to_holder: Uuid,
        creative: &SlotCreative,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        // The holder predicate is the single-winner guard between a racing
        // expiry sweep and competing accepts.
        let result = sqlx::query(
            "UPDATE bookings SET holder_id = $3, display_name = $4, target_url = $5, \
             tagline = $6, image_url = $7, updated_at = NOW() \
             WHERE id = $1 AND status = 'ACTIVE' AND holder_id = $2",
        )
        .bind(id)
        .bind(from_holder)
        .bind(to_holder)
        .bind(&creative.display_name)
        .bind(&creative.target_url)
        .bind(&creative.tagline)
        .bind(&creative.image_url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM bookings WHERE 1=1", BOOKING_COLS));
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(tier) = filter.tier {
            qb.push(" AND tier = ").push_bind(tier.as_str());
        }
        if let Some(slot) = filter.slot {
            qb.push(" AND slot_x = ").push_bind(slot.x);
            qb.push(" AND slot_y = ").push_bind(slot.y);
        }
        if let Some(search) = &filter.search {
            qb.push(" AND display_name ILIKE ")
                .push_bind(format!("%{}%", search));
        }
        if let Some((start, end)) = filter.overlaps {
            qb.push(" AND start_date < ").push_bind(end);
            qb.push(" AND end_date > ").push_bind(start);
        }
        qb.push(" ORDER BY created_at DESC");
        if filter.limit > 0 {
            qb.push(" LIMIT ").push_bind(filter.limit);
        }
        let rows: Vec<BookingRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows_into_bookings(rows)
    }

    async fn admin_cancel(
        &self,
        id: Uuid,
        actor: &str,
        reason: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'CANCELLED', updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            BOOKING_COLS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let entry = AuditLogEntry::new(
            actor,
            "booking.cancel",
            "booking",
            id,
            serde_json::json!({ "reason": reason }),
        );
        append_audit_tx(&mut tx, &entry).await?;
        tx.commit().await?;
        row.into_booking().map(Some)
    }

    async fn admin_force_activate(
        &self,
        id: Uuid,
        actor: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'ACTIVE', updated_at = NOW() \
             WHERE id = $1 AND status = 'PENDING' RETURNING {}",
            BOOKING_COLS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let entry = AuditLogEntry::new(
            actor,
            "booking.force_activate",
            "booking",
            id,
            serde_json::json!({}),
        );
        append_audit_tx(&mut tx, &entry).await?;
        tx.commit().await?;
        row.into_booking().map(Some)
    }

    async fn admin_extend(
        &self,
        id: Uuid,
        extra_days: i64,
        actor: &str,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;
        // expires_at stays NULL for date-era rows; NULL + interval is NULL.
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET end_date = end_date + $2, \
             expires_at = expires_at + make_interval(days => $2), updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            BOOKING_COLS
        ))
        .bind(id)
        .bind(i32::try_from(extra_days)?)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let entry = AuditLogEntry::new(
            actor,
            "booking.extend",
            "booking",
            id,
            serde_json::json!({ "extra_days": extra_days }),
        );
        append_audit_tx(&mut tx, &entry).await?;
        tx.commit().await?;
        row.into_booking().map(Some)
    }
}
