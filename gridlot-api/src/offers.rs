use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use gridlot_offer::{
    BuyoutOffer, OfferDecision, OfferRequest, ResolveAuthority, ResolveOutcome, Settlement,
};
use gridlot_core::CoreError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitOfferRequest {
    pub x: i32,
    pub y: i32,
    pub booking_id: Uuid,
    pub buyer_email: String,
    pub buyer_name: Option<String>,
    pub amount_cents: i64,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OfferView {
    pub id: Uuid,
    pub x: i32,
    pub y: i32,
    pub booking_id: Uuid,
    pub amount_cents: i64,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&BuyoutOffer> for OfferView {
    fn from(o: &BuyoutOffer) -> Self {
        OfferView {
            id: o.id,
            x: o.slot.x,
            y: o.slot.y,
            booking_id: o.booking_id,
            amount_cents: o.amount_cents,
            status: o.status.to_string(),
            expires_at: o.expires_at,
            created_at: o.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RespondOfferRequest {
    /// "accept" or "reject".
    pub decision: String,
    /// The deciding holder; must own the target booking's slot.
    pub holder_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RespondOfferResponse {
    pub offer: OfferView,
    /// Present only on acceptance: the recorded fund split.
    pub settlement: Option<Settlement>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/offers
/// Open a 72h buyout offer against the active booking on a slot.
pub async fn submit_offer(
    State(state): State<AppState>,
    Json(req): Json<SubmitOfferRequest>,
) -> Result<Json<OfferView>, AppError> {
    let offer = state
        .negotiation
        .submit(OfferRequest {
            x: req.x,
            y: req.y,
            booking_id: req.booking_id,
            buyer_email: req.buyer_email,
            buyer_name: req.buyer_name,
            amount_cents: req.amount_cents,
            message: req.message,
        })
        .await?;
    Ok(Json(OfferView::from(&offer)))
}

/// POST /v1/offers/{id}/respond
/// The slot holder's accept/reject decision.
pub async fn respond_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
    Json(req): Json<RespondOfferRequest>,
) -> Result<Json<RespondOfferResponse>, AppError> {
    let decision: OfferDecision = req
        .decision
        .parse()
        .map_err(CoreError::Validation)?;

    let outcome = state
        .negotiation
        .resolve(offer_id, decision, ResolveAuthority::Holder(req.holder_id))
        .await?;

    let response = match outcome {
        ResolveOutcome::Accepted {
            offer, settlement, ..
        } => RespondOfferResponse {
            offer: OfferView::from(&offer),
            settlement: Some(settlement),
        },
        ResolveOutcome::Rejected(offer) => RespondOfferResponse {
            offer: OfferView::from(&offer),
            settlement: None,
        },
    };
    Ok(Json(response))
}
