use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use gridlot_booking::models::{Booking, BookingStatus};
use gridlot_booking::repository::{BookingFilter, BookingRepository};
use gridlot_catalog::{Tier, TierConfig, TierConfigRepository};
use gridlot_core::audit::{AuditLogEntry, AuditLogRepository};
use gridlot_core::CoreError;
use gridlot_offer::models::{BuyoutOffer, OfferStatus};
use gridlot_offer::repository::{OfferFilter, OfferRepository};
use gridlot_offer::{OfferDecision, ResolveAuthority, ResolveOutcome};
use gridlot_shared::SlotCoord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{operator_auth_middleware, OperatorActor};
use crate::state::AppState;

/// Operator channel: reads plus override mutations, all behind the shared
/// secret. Overrides skip the normal business-rule checks on purpose;
/// every mutation lands in the audit log.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route("/bookings/{id}/force-activate", post(force_activate_booking))
        .route("/bookings/{id}/extend", post(extend_booking))
        .route("/offers", get(list_offers))
        .route("/offers/{id}/resolve", post(resolve_offer))
        .route("/tiers", get(list_tiers))
        .route("/tiers/{tier}/availability", post(set_tier_availability))
        .route("/audit", get(list_audit))
        .layer(axum::middleware::from_fn_with_state(
            state,
            operator_auth_middleware,
        ))
}

// ============================================================================
// Read endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub tier: Option<String>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let status = query
        .status
        .map(|s| s.parse::<BookingStatus>())
        .transpose()
        .map_err(CoreError::Validation)?;
    let tier = query
        .tier
        .map(|t| t.parse::<Tier>())
        .transpose()
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    let slot = match (query.x, query.y) {
        (Some(x), Some(y)) => {
            Some(SlotCoord::new(x, y).map_err(|e| CoreError::Validation(e.to_string()))?)
        }
        _ => None,
    };
    let bookings = state
        .bookings
        .list(&BookingFilter {
            status,
            tier,
            slot,
            search: query.q,
            overlaps: None,
            limit: query.limit.unwrap_or(100),
        })
        .await
        .map_err(CoreError::store)?;
    Ok(Json(bookings))
}

#[derive(Debug, Deserialize)]
pub struct OffersQuery {
    pub status: Option<String>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub limit: Option<i64>,
}

async fn list_offers(
    State(state): State<AppState>,
    Query(query): Query<OffersQuery>,
) -> Result<Json<Vec<BuyoutOffer>>, AppError> {
    let status = query
        .status
        .map(|s| s.parse::<OfferStatus>())
        .transpose()
        .map_err(CoreError::Validation)?;
    let slot = match (query.x, query.y) {
        (Some(x), Some(y)) => {
            Some(SlotCoord::new(x, y).map_err(|e| CoreError::Validation(e.to_string()))?)
        }
        _ => None,
    };
    let offers = state
        .offers
        .list(&OfferFilter {
            status,
            slot,
            limit: query.limit.unwrap_or(100),
        })
        .await
        .map_err(CoreError::store)?;
    Ok(Json(offers))
}

async fn list_tiers(State(state): State<AppState>) -> Result<Json<Vec<TierConfig>>, AppError> {
    let tiers = state.tiers.list().await.map_err(CoreError::store)?;
    Ok(Json(tiers))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    let entries = state
        .audit
        .list(query.limit.unwrap_or(100), query.offset.unwrap_or(0))
        .await
        .map_err(CoreError::store)?;
    Ok(Json(entries))
}

// ============================================================================
// Override mutations
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

/// POST /v1/admin/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(OperatorActor(actor)): Extension<OperatorActor>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .bookings
        .admin_cancel(booking_id, &actor, req.reason.as_deref().unwrap_or(""))
        .await
        .map_err(CoreError::store)?
        .ok_or(CoreError::NotFound("booking"))?;
    Ok(Json(booking))
}

/// POST /v1/admin/bookings/{id}/force-activate
/// For manually settled payments; no payment confirmation involved.
async fn force_activate_booking(
    State(state): State<AppState>,
    Extension(OperatorActor(actor)): Extension<OperatorActor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = match state
        .bookings
        .admin_force_activate(booking_id, &actor)
        .await
        .map_err(CoreError::store)?
    {
        Some(booking) => booking,
        // Zero rows: either unknown id or not pending any more.
        None => match state.bookings.get(booking_id).await.map_err(CoreError::store)? {
            Some(_) => return Err(CoreError::AlreadyResolved.into()),
            None => return Err(CoreError::NotFound("booking").into()),
        },
    };
    Ok(Json(booking))
}

#[derive(Debug, Deserialize)]
pub struct ExtendBookingRequest {
    pub extra_days: i64,
}

/// POST /v1/admin/bookings/{id}/extend
async fn extend_booking(
    State(state): State<AppState>,
    Extension(OperatorActor(actor)): Extension<OperatorActor>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<ExtendBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    if req.extra_days <= 0 {
        return Err(CoreError::Validation("extra_days must be positive".into()).into());
    }
    let booking = state
        .bookings
        .admin_extend(booking_id, req.extra_days, &actor)
        .await
        .map_err(CoreError::store)?
        .ok_or(CoreError::NotFound("booking"))?;
    Ok(Json(booking))
}

#[derive(Debug, Deserialize)]
pub struct ResolveOfferRequest {
    pub decision: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveOfferResponse {
    pub offer: BuyoutOffer,
    pub settlement: Option<gridlot_offer::Settlement>,
}

/// POST /v1/admin/offers/{id}/resolve
/// Same effect as the holder's decision, under operator authority.
async fn resolve_offer(
    State(state): State<AppState>,
    Extension(OperatorActor(actor)): Extension<OperatorActor>,
    Path(offer_id): Path<Uuid>,
    Json(req): Json<ResolveOfferRequest>,
) -> Result<Json<ResolveOfferResponse>, AppError> {
    let decision: OfferDecision = req
        .decision
        .parse()
        .map_err(CoreError::Validation)?;
    let outcome = state
        .negotiation
        .resolve(offer_id, decision, ResolveAuthority::Operator(actor))
        .await?;
    let response = match outcome {
        ResolveOutcome::Accepted {
            offer, settlement, ..
        } => ResolveOfferResponse {
            offer,
            settlement: Some(settlement),
        },
        ResolveOutcome::Rejected(offer) => ResolveOfferResponse {
            offer,
            settlement: None,
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SetAvailabilityRequest {
    pub available: bool,
}

/// POST /v1/admin/tiers/{tier}/availability
/// Effective for the next reservation attempt immediately; the reservation
/// path re-reads tier config every time.
async fn set_tier_availability(
    State(state): State<AppState>,
    Extension(OperatorActor(actor)): Extension<OperatorActor>,
    Path(tier): Path<String>,
    Json(req): Json<SetAvailabilityRequest>,
) -> Result<Json<TierConfig>, AppError> {
    let tier: Tier = tier
        .parse()
        .map_err(|e: gridlot_catalog::tier::UnknownTier| CoreError::Validation(e.to_string()))?;
    let updated = state
        .tiers
        .set_availability(tier, req.available, &actor)
        .await
        .map_err(CoreError::store)?;
    if !updated {
        return Err(CoreError::NotFound("tier config").into());
    }
    let cfg = state
        .tiers
        .get(tier)
        .await
        .map_err(CoreError::store)?
        .ok_or(CoreError::NotFound("tier config"))?;
    Ok(Json(cfg))
}
