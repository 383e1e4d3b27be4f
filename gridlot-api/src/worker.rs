use chrono::Utc;
use gridlot_booking::BookingSweeper;
use gridlot_offer::OfferSweeper;
use std::time::Duration;
use tracing::error;

use crate::state::AppState;

/// Expiration sweep loop: both sub-sweeps on one cadence. Each sub-sweep
/// is a single conditional bulk update, so overlapping or repeated runs
/// are harmless; the loop only provides the cadence.
pub async fn run_sweep_worker(state: AppState, every: Duration, reminder_window_hours: i64) {
    let bookings = BookingSweeper::new(
        state.bookings.clone(),
        state.holders.clone(),
        state.notifier.clone(),
        reminder_window_hours,
    );
    let offers = OfferSweeper::new(state.offers.clone());

    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let now = Utc::now();
        if let Err(e) = bookings.sweep(now).await {
            error!("booking sweep failed: {}", e);
        }
        if let Err(e) = offers.sweep(now).await {
            error!("offer sweep failed: {}", e);
        }
    }
}

/// Reminder/notice loop on its own, slower cadence. At-most-once delivery
/// is guaranteed by the per-booking sent flags, not by this loop.
pub async fn run_reminder_worker(state: AppState, every: Duration, reminder_window_hours: i64) {
    let sweeper = BookingSweeper::new(
        state.bookings.clone(),
        state.holders.clone(),
        state.notifier.clone(),
        reminder_window_hours,
    );

    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match sweeper.remind(Utc::now()).await {
            Ok(report) => {
                if report.reminders_sent > 0 || report.notices_sent > 0 {
                    tracing::info!(
                        reminders = report.reminders_sent,
                        notices = report.notices_sent,
                        "reminder pass completed"
                    );
                }
            }
            Err(e) => error!("reminder pass failed: {}", e),
        }
    }
}
