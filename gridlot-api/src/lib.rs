use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod error;
pub mod grid;
pub mod middleware;
pub mod offers;
pub mod reservations;
pub mod state;
pub mod webhooks;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/v1/grid", get(grid::snapshot))
        .route("/v1/grid/{x}/{y}", get(grid::slot_detail))
        .route("/v1/reservations", post(reservations::create_reservation))
        .route("/v1/bookings/{id}", get(reservations::get_booking))
        .route("/v1/offers", post(offers::submit_offer))
        .route("/v1/offers/{id}/respond", post(offers::respond_offer))
        .route("/v1/webhooks/payments", post(webhooks::handle_payment_webhook))
        .nest("/v1/admin", admin::routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resiliency::circuit_breaker_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
