use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use gridlot_booking::models::BookingStatus;
use gridlot_booking::repository::{BookingFilter, BookingRepository};
use gridlot_catalog::{Tier, TierConfig, TierConfigRepository};
use gridlot_core::CoreError;
use gridlot_shared::SlotCoord;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::reservations::BookingView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    /// Optional occupancy window; defaults to "now".
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct TierMeta {
    pub tier: Tier,
    pub price_per_day_cents: i64,
    pub is_available: bool,
}

impl From<&TierConfig> for TierMeta {
    fn from(cfg: &TierConfig) -> Self {
        TierMeta {
            tier: cfg.tier,
            price_per_day_cents: cfg.price_per_day_cents,
            is_available: cfg.is_available,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GridSnapshot {
    pub grid_size: i32,
    pub suggested_offer_multiplier: f64,
    pub tiers: Vec<TierMeta>,
    pub slots: Vec<BookingView>,
}

#[derive(Debug, Serialize)]
pub struct SlotDetail {
    pub x: i32,
    pub y: i32,
    pub tier: Tier,
    pub price_per_day_cents: Option<i64>,
    pub is_available: Option<bool>,
    pub occupant: Option<BookingView>,
}

/// GET /v1/grid
/// Current occupancy plus tier metadata, the payload a grid UI renders
/// from. An optional date window returns occupancy for that window.
pub async fn snapshot(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<GridSnapshot>, AppError> {
    let tiers = state.tiers.list().await.map_err(CoreError::store)?;

    let overlaps = match (query.from, query.to) {
        (Some(from), Some(to)) if from < to => Some((from, to)),
        _ => None,
    };
    let active = state
        .bookings
        .list(&BookingFilter {
            status: Some(BookingStatus::Active),
            overlaps,
            ..Default::default()
        })
        .await
        .map_err(CoreError::store)?;

    Ok(Json(GridSnapshot {
        grid_size: gridlot_shared::GRID_SIZE,
        suggested_offer_multiplier: state.suggested_offer_multiplier,
        tiers: tiers.iter().map(TierMeta::from).collect(),
        slots: active.iter().map(BookingView::from).collect(),
    }))
}

/// GET /v1/grid/{x}/{y}
/// Tier metadata and current occupant for one slot.
pub async fn slot_detail(
    State(state): State<AppState>,
    Path((x, y)): Path<(i32, i32)>,
) -> Result<Json<SlotDetail>, AppError> {
    let slot = SlotCoord::new(x, y).map_err(|e| CoreError::Validation(e.to_string()))?;
    let tier = Tier::of(slot);
    let cfg = state.tiers.get(tier).await.map_err(CoreError::store)?;
    let occupant = state
        .bookings
        .active_on_slot(slot)
        .await
        .map_err(CoreError::store)?;

    Ok(Json(SlotDetail {
        x,
        y,
        tier,
        price_per_day_cents: cfg.as_ref().map(|c| c.price_per_day_cents),
        is_available: cfg.as_ref().map(|c| c.is_available),
        occupant: occupant.as_ref().map(BookingView::from),
    }))
}
