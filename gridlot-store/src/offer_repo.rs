use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridlot_offer::models::{BuyoutOffer, OfferStatus};
use gridlot_offer::repository::{OfferFilter, OfferRepository};
use gridlot_shared::SlotCoord;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub struct PostgresOfferRepository {
    pub pool: PgPool,
}

impl PostgresOfferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const OFFER_COLS: &str = "id, slot_x, slot_y, booking_id, buyer_email, buyer_name, \
     amount_cents, message, status, expires_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: Uuid,
    slot_x: i32,
    slot_y: i32,
    booking_id: Uuid,
    buyer_email: String,
    buyer_name: Option<String>,
    amount_cents: i64,
    message: Option<String>,
    status: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OfferRow {
    fn into_offer(self) -> Result<BuyoutOffer, Box<dyn std::error::Error + Send + Sync>> {
        Ok(BuyoutOffer {
            id: self.id,
            slot: SlotCoord::new(self.slot_x, self.slot_y)?,
            booking_id: self.booking_id,
            buyer_email: self.buyer_email,
            buyer_name: self.buyer_name,
            amount_cents: self.amount_cents,
            message: self.message,
            status: self.status.parse()?,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl OfferRepository for PostgresOfferRepository {
    async fn insert(
        &self,
        offer: &BuyoutOffer,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO buyout_offers (id, slot_x, slot_y, booking_id, buyer_email, \
             buyer_name, amount_cents, message, status, expires_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(offer.id)
        .bind(offer.slot.x)
        .bind(offer.slot.y)
        .bind(offer.booking_id)
        .bind(&offer.buyer_email)
        .bind(&offer.buyer_name)
        .bind(offer.amount_cents)
        .bind(&offer.message)
        .bind(offer.status.as_str())
        .bind(offer.expires_at)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<BuyoutOffer>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {} FROM buyout_offers WHERE id = $1",
            OFFER_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(OfferRow::into_offer).transpose()
    }

    async fn pending_for_buyer(
        &self,
        slot: SlotCoord,
        buyer_email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BuyoutOffer>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {} FROM buyout_offers \
             WHERE slot_x = $1 AND slot_y = $2 AND buyer_email = $3 \
               AND status = 'PENDING' AND expires_at > $4 \
             LIMIT 1",
            OFFER_COLS
        ))
        .bind(slot.x)
        .bind(slot.y)
        .bind(buyer_email)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(OfferRow::into_offer).transpose()
    }

    async fn transition(
        &self,
        id: Uuid,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE buyout_offers SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn cancel_other_pending(
        &self,
        slot: SlotCoord,
        except: Uuid,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE buyout_offers SET status = 'CANCELLED', updated_at = NOW() \
             WHERE slot_x = $1 AND slot_y = $2 AND id <> $3 AND status = 'PENDING'",
        )
        .bind(slot.x)
        .bind(slot.y)
        .bind(except)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn expire_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE buyout_offers SET status = 'EXPIRED', updated_at = NOW() \
             WHERE status = 'PENDING' AND expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list(
        &self,
        filter: &OfferFilter,
    ) -> Result<Vec<BuyoutOffer>, Box<dyn std::error::Error + Send + Sync>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM buyout_offers WHERE 1=1", OFFER_COLS));
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(slot) = filter.slot {
            qb.push(" AND slot_x = ").push_bind(slot.x);
            qb.push(" AND slot_y = ").push_bind(slot.y);
        }
        qb.push(" ORDER BY created_at DESC");
        if filter.limit > 0 {
            qb.push(" LIMIT ").push_bind(filter.limit);
        }
        let rows: Vec<OfferRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(OfferRow::into_offer).collect()
    }
}
