use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridlot_core::identity::{Holder, HolderInfo, HolderRepository};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresHolderRepository {
    pub pool: PgPool,
}

impl PostgresHolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct HolderRow {
    id: Uuid,
    email: String,
    display_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<HolderRow> for Holder {
    fn from(row: HolderRow) -> Self {
        Holder {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl HolderRepository for PostgresHolderRepository {
    async fn upsert(
        &self,
        info: &HolderInfo,
    ) -> Result<Holder, Box<dyn std::error::Error + Send + Sync>> {
        // Idempotent on email; a name supplied later fills an empty one but
        // never overwrites an existing one.
        let row = sqlx::query_as::<_, HolderRow>(
            "INSERT INTO holders (id, email, display_name) VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO UPDATE \
             SET display_name = COALESCE(holders.display_name, EXCLUDED.display_name) \
             RETURNING id, email, display_name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&info.email)
        .bind(&info.display_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find(
        &self,
        id: Uuid,
    ) -> Result<Option<Holder>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, HolderRow>(
            "SELECT id, email, display_name, created_at FROM holders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Holder::from))
    }
}
