use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use gridlot_booking::models::{Booking, SlotCreative};
use gridlot_booking::repository::BookingRepository;
use gridlot_booking::reservation::ReservationRequest;
use gridlot_catalog::Tier;
use gridlot_core::identity::HolderInfo;
use gridlot_core::CoreError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub x: i32,
    pub y: i32,
    pub tier: Tier,
    pub duration_days: u32,
    pub email: String,
    pub holder_name: Option<String>,
    pub display_name: String,
    pub target_url: String,
    pub tagline: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub boost: bool,
}

/// Public-safe projection: no payment references, no holder contact.
#[derive(Debug, Serialize)]
pub struct BookingView {
    pub id: Uuid,
    pub x: i32,
    pub y: i32,
    pub tier: Tier,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub expires_at: Option<DateTime<Utc>>,
    pub amount_cents: i64,
    pub display_name: String,
    pub target_url: String,
    pub tagline: Option<String>,
    pub image_url: Option<String>,
    pub boost: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Booking> for BookingView {
    fn from(b: &Booking) -> Self {
        BookingView {
            id: b.id,
            x: b.slot.x,
            y: b.slot.y,
            tier: b.tier,
            status: b.status.to_string(),
            start_date: b.start_date,
            end_date: b.end_date,
            expires_at: b.expires_at,
            amount_cents: b.amount_cents,
            display_name: b.creative.display_name.clone(),
            target_url: b.creative.target_url.clone(),
            tagline: b.creative.tagline.clone(),
            image_url: b.creative.image_url.clone(),
            boost: b.boost,
            created_at: b.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateReservationResponse {
    pub booking: BookingView,
    pub payment_session: String,
    pub checkout_url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/reservations
/// Reserve a slot; the booking stays pending until the payment webhook.
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<Json<CreateReservationResponse>, AppError> {
    let outcome = state
        .reservations
        .create(ReservationRequest {
            x: req.x,
            y: req.y,
            tier: req.tier,
            duration_days: req.duration_days,
            holder: HolderInfo {
                email: req.email,
                display_name: req.holder_name,
            },
            creative: SlotCreative {
                display_name: req.display_name,
                target_url: req.target_url,
                tagline: req.tagline,
                image_url: req.image_url,
            },
            boost: req.boost,
        })
        .await?;

    Ok(Json(CreateReservationResponse {
        booking: BookingView::from(&outcome.booking),
        payment_session: outcome.checkout.session_id,
        checkout_url: outcome.checkout.redirect_url,
    }))
}

/// GET /v1/bookings/{id}
/// Public projection of a single booking.
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    let booking = state
        .bookings
        .get(booking_id)
        .await
        .map_err(CoreError::store)?
        .ok_or(CoreError::NotFound("booking"))?;
    Ok(Json(BookingView::from(&booking)))
}
