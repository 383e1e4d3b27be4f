use gridlot_api::{app, state::AppState};
use gridlot_booking::{ActivationService, ReservationService};
use gridlot_core::notify::LogNotifier;
use gridlot_core::payment::MockPaymentGateway;
use gridlot_offer::NegotiationService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridlot_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = gridlot_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Gridlot API on port {}", config.server.port);

    // Database
    let db = gridlot_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Repositories
    let booking_repo = Arc::new(gridlot_store::PostgresBookingRepository::new(db.pool.clone()));
    let offer_repo = Arc::new(gridlot_store::PostgresOfferRepository::new(db.pool.clone()));
    let tier_repo = Arc::new(gridlot_store::PostgresTierConfigRepository::new(db.pool.clone()));
    let holder_repo = Arc::new(gridlot_store::PostgresHolderRepository::new(db.pool.clone()));
    let audit_repo = Arc::new(gridlot_store::PostgresAuditLogRepository::new(db.pool.clone()));

    tier_repo
        .seed_defaults()
        .await
        .expect("Failed to seed tier config");

    // External collaborators. Checkout/redirect and real delivery live
    // outside this core; the development stand-ins log and succeed.
    let gateway = Arc::new(MockPaymentGateway);
    let notifier = Arc::new(LogNotifier);

    // Services
    let reservations = Arc::new(ReservationService::new(
        booking_repo.clone(),
        tier_repo.clone(),
        holder_repo.clone(),
        gateway,
    ));
    let activation = Arc::new(ActivationService::new(
        booking_repo.clone(),
        holder_repo.clone(),
        notifier.clone(),
    ));
    let negotiation = Arc::new(NegotiationService::new(
        offer_repo.clone(),
        booking_repo.clone(),
        tier_repo.clone(),
        holder_repo.clone(),
        notifier.clone(),
        audit_repo.clone(),
        config.business_rules.min_offer_cents,
    ));

    let state = AppState {
        bookings: booking_repo,
        offers: offer_repo,
        tiers: tier_repo,
        holders: holder_repo,
        audit: audit_repo,
        notifier,
        reservations,
        activation,
        negotiation,
        operator_token: config.operator.api_token.clone(),
        suggested_offer_multiplier: config.business_rules.suggested_offer_multiplier,
        resiliency: Arc::new(Default::default()),
    };

    // Scheduled maintenance: expiry sweeps plus the reminder pass
    tokio::spawn(gridlot_api::worker::run_sweep_worker(
        state.clone(),
        Duration::from_secs(config.sweep.interval_seconds),
        config.sweep.reminder_window_hours,
    ));
    tokio::spawn(gridlot_api::worker::run_reminder_worker(
        state.clone(),
        Duration::from_secs(config.sweep.reminder_interval_seconds),
        config.sweep.reminder_window_hours,
    ));

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
