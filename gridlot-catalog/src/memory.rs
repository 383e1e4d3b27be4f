use crate::config::TierConfig;
use crate::repository::TierConfigRepository;
use crate::tier::Tier;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

/// HashMap-backed tier configuration, used in development mode and by
/// service tests.
pub struct MemoryTierConfigStore {
    rows: Mutex<HashMap<Tier, TierConfig>>,
}

impl MemoryTierConfigStore {
    pub fn new(rows: Vec<TierConfig>) -> Self {
        Self {
            rows: Mutex::new(rows.into_iter().map(|c| (c.tier, c)).collect()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(TierConfig::defaults())
    }
}

#[async_trait]
impl TierConfigRepository for MemoryTierConfigStore {
    async fn get(
        &self,
        tier: Tier,
    ) -> Result<Option<TierConfig>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| "tier config lock poisoned".to_string())?;
        Ok(rows.get(&tier).cloned())
    }

    async fn list(&self) -> Result<Vec<TierConfig>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| "tier config lock poisoned".to_string())?;
        let mut all: Vec<TierConfig> = rows.values().cloned().collect();
        all.sort_by_key(|c| c.tier.as_str());
        Ok(all)
    }

    async fn set_availability(
        &self,
        tier: Tier,
        available: bool,
        actor: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| "tier config lock poisoned".to_string())?;
        match rows.get_mut(&tier) {
            Some(cfg) => {
                cfg.is_available = available;
                cfg.updated_by = Some(actor.to_string());
                cfg.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn availability_flip_is_visible_immediately() {
        let store = MemoryTierConfigStore::with_defaults();
        store.set_availability(Tier::Viral, false, "ops").await.unwrap();
        let cfg = store.get(Tier::Viral).await.unwrap().unwrap();
        assert!(!cfg.is_available);
        assert_eq!(cfg.updated_by.as_deref(), Some("ops"));
    }
}
