use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use gridlot_api::state::{AppState, Resiliency};
use gridlot_booking::memory::MemoryBookingStore;
use gridlot_booking::{ActivationService, ReservationService};
use gridlot_catalog::memory::MemoryTierConfigStore;
use gridlot_core::notify::LogNotifier;
use gridlot_core::payment::MockPaymentGateway;
use gridlot_offer::memory::MemoryOfferStore;
use gridlot_offer::NegotiationService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const OPERATOR_TOKEN: &str = "test-operator-token";

fn test_app() -> Router {
    let store = Arc::new(MemoryBookingStore::new());
    let offers = Arc::new(MemoryOfferStore::new());
    let tiers = Arc::new(MemoryTierConfigStore::with_defaults());
    let gateway = Arc::new(MockPaymentGateway);
    let notifier = Arc::new(LogNotifier);

    let reservations = Arc::new(ReservationService::new(
        store.clone(),
        tiers.clone(),
        store.clone(),
        gateway,
    ));
    let activation = Arc::new(ActivationService::new(
        store.clone(),
        store.clone(),
        notifier.clone(),
    ));
    let negotiation = Arc::new(NegotiationService::new(
        offers.clone(),
        store.clone(),
        tiers.clone(),
        store.clone(),
        notifier.clone(),
        store.clone(),
        0,
    ));

    let state = AppState {
        bookings: store.clone(),
        offers,
        tiers,
        holders: store.clone(),
        audit: store,
        notifier,
        reservations,
        activation,
        negotiation,
        operator_token: OPERATOR_TOKEN.to_string(),
        suggested_offer_multiplier: 1.5,
        resiliency: Arc::new(Resiliency::default()),
    };
    gridlot_api::app(state)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn webhook(kind: &str, session: &str, intent: Option<&str>) -> Value {
    json!({
        "id": "evt_test",
        "type": kind,
        "data": { "object": { "id": session, "payment_intent": intent } }
    })
}

#[tokio::test]
async fn reservation_to_activation_to_occupancy() {
    let app = test_app();

    // Reserve the center slot for a week.
    let (status, body) = send(
        &app,
        post_json(
            "/v1/reservations",
            json!({
                "x": 18, "y": 18, "tier": "one", "duration_days": 7,
                "email": "holder@example.com", "holder_name": "Holder",
                "display_name": "Acme", "target_url": "https://acme.example"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "reservation failed: {body}");
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();
    let session = body["payment_session"].as_str().unwrap().to_string();
    assert_eq!(body["booking"]["status"], "PENDING");
    assert_eq!(body["booking"]["amount_cents"], 35_000);

    // Pending bookings don't show on the public grid.
    let (_, grid) = send(&app, get("/v1/grid")).await;
    assert_eq!(grid["slots"].as_array().unwrap().len(), 0);

    // The payment confirmation webhook activates exactly once.
    let (status, _) = send(
        &app,
        post_json(
            "/v1/webhooks/payments",
            webhook("checkout.session.completed", &session, Some("pi_1")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Redelivery is acknowledged and changes nothing.
    let (status, _) = send(
        &app,
        post_json(
            "/v1/webhooks/payments",
            webhook("checkout.session.completed", &session, Some("pi_1")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The slot is occupied now.
    let (_, grid) = send(&app, get("/v1/grid")).await;
    assert_eq!(grid["slots"].as_array().unwrap().len(), 1);
    assert_eq!(grid["slots"][0]["display_name"], "Acme");

    let (_, detail) = send(&app, get("/v1/grid/18/18")).await;
    assert_eq!(detail["tier"], "one");
    assert_eq!(detail["occupant"]["id"].as_str().unwrap(), booking_id);

    // Public projection carries no payment references.
    let (status, view) = send(&app, get(&format!("/v1/bookings/{booking_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "ACTIVE");
    assert!(view.get("payment_session_ref").is_none());
    assert!(view.get("payment_charge_ref").is_none());

    // A second reservation on the occupied slot conflicts.
    let (status, _) = send(
        &app,
        post_json(
            "/v1/reservations",
            json!({
                "x": 18, "y": 18, "tier": "one", "duration_days": 3,
                "email": "other@example.com",
                "display_name": "Rival", "target_url": "https://rival.example"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn operator_channel_requires_the_shared_secret() {
    let app = test_app();

    let (status, _) = send(&app, get("/v1/admin/bookings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authed = Request::builder()
        .uri("/v1/admin/bookings")
        .header(header::AUTHORIZATION, format!("Bearer {OPERATOR_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, authed).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn buyout_flow_transfers_the_slot() {
    let app = test_app();

    // Seller books and pays for a corner slot.
    let (_, body) = send(
        &app,
        post_json(
            "/v1/reservations",
            json!({
                "x": 0, "y": 0, "tier": "corner_ten", "duration_days": 10,
                "email": "seller@example.com",
                "display_name": "Seller Co", "target_url": "https://seller.example"
            }),
        ),
    )
    .await;
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();
    let session = body["payment_session"].as_str().unwrap().to_string();
    send(
        &app,
        post_json(
            "/v1/webhooks/payments",
            webhook("checkout.session.completed", &session, Some("pi_corner")),
        ),
    )
    .await;

    // Buyer opens an offer.
    let (status, offer) = send(
        &app,
        post_json(
            "/v1/offers",
            json!({
                "x": 0, "y": 0, "booking_id": booking_id,
                "buyer_email": "buyer@example.com", "buyer_name": "Buyer",
                "amount_cents": 40_000
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "offer failed: {offer}");
    let offer_id = offer["id"].as_str().unwrap().to_string();
    assert_eq!(offer["status"], "PENDING");

    // A duplicate offer from the same buyer is rejected.
    let (status, _) = send(
        &app,
        post_json(
            "/v1/offers",
            json!({
                "x": 0, "y": 0, "booking_id": booking_id,
                "buyer_email": "buyer@example.com",
                "amount_cents": 50_000
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The holder id is internal; fish it out through the operator channel.
    let admin = Request::builder()
        .uri("/v1/admin/bookings?status=ACTIVE")
        .header(header::AUTHORIZATION, format!("Bearer {OPERATOR_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (_, bookings) = send(&app, admin).await;
    let holder_id = bookings[0]["holder_id"].as_str().unwrap().to_string();

    // A stranger can't resolve the offer.
    let (status, _) = send(
        &app,
        post_json(
            &format!("/v1/offers/{offer_id}/respond"),
            json!({ "decision": "accept", "holder_id": uuid::Uuid::new_v4() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The holder accepts; the settlement records the split and the slot
    // transfers to the buyer.
    let (status, resolved) = send(
        &app,
        post_json(
            &format!("/v1/offers/{offer_id}/respond"),
            json!({ "decision": "accept", "holder_id": holder_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "resolve failed: {resolved}");
    assert_eq!(resolved["offer"]["status"], "ACCEPTED");
    // 10 days remaining at 2500/day: residual 25000 -> payout 17500 + 12000.
    assert_eq!(resolved["settlement"]["residual_value_cents"], 25_000);
    assert_eq!(resolved["settlement"]["holder_payout_cents"], 29_500);
    assert_eq!(resolved["settlement"]["platform_fee_cents"], 8_000);

    let (_, detail) = send(&app, get("/v1/grid/0/0")).await;
    assert_eq!(detail["occupant"]["display_name"], "Buyer");

    // Deciding again is an idempotent conflict, not a second transfer.
    let (status, _) = send(
        &app,
        post_json(
            &format!("/v1/offers/{offer_id}/respond"),
            json!({ "decision": "reject", "holder_id": holder_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
