use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridlot_catalog::{Tier, TierConfig, TierConfigRepository};
use gridlot_core::audit::AuditLogEntry;
use sqlx::PgPool;

pub struct PostgresTierConfigRepository {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct TierConfigRow {
    tier: String,
    is_available: bool,
    price_per_day_cents: i64,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl TierConfigRow {
    fn into_config(self) -> Result<TierConfig, Box<dyn std::error::Error + Send + Sync>> {
        Ok(TierConfig {
            tier: self.tier.parse()?,
            is_available: self.is_available,
            price_per_day_cents: self.price_per_day_cents,
            updated_by: self.updated_by,
            updated_at: self.updated_at,
        })
    }
}

impl PostgresTierConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the launch defaults for any tier row that doesn't exist yet.
    /// Existing rows are left alone so operator edits survive restarts.
    pub async fn seed_defaults(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for cfg in TierConfig::defaults() {
            sqlx::query(
                "INSERT INTO tier_config (tier, is_available, price_per_day_cents) \
                 VALUES ($1, $2, $3) ON CONFLICT (tier) DO NOTHING",
            )
            .bind(cfg.tier.as_str())
            .bind(cfg.is_available)
            .bind(cfg.price_per_day_cents)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TierConfigRepository for PostgresTierConfigRepository {
    async fn get(
        &self,
        tier: Tier,
    ) -> Result<Option<TierConfig>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, TierConfigRow>(
            "SELECT tier, is_available, price_per_day_cents, updated_by, updated_at \
             FROM tier_config WHERE tier = $1",
        )
        .bind(tier.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TierConfigRow::into_config).transpose()
    }

    async fn list(&self) -> Result<Vec<TierConfig>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, TierConfigRow>(
            "SELECT tier, is_available, price_per_day_cents, updated_by, updated_at \
             FROM tier_config ORDER BY tier",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TierConfigRow::into_config).collect()
    }

    async fn set_availability(
        &self,
        tier: Tier,
        available: bool,
        actor: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        // Flip and audit in one transaction.
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE tier_config SET is_available = $2, updated_by = $3, updated_at = NOW() \
             WHERE tier = $1",
        )
        .bind(tier.as_str())
        .bind(available)
        .bind(actor)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        let entry = AuditLogEntry::new(
            actor,
            "tier.set_availability",
            "tier",
            tier.as_str(),
            serde_json::json!({ "available": available }),
        );
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
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }
}
