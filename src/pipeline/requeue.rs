//! Periodic sweep re-dispatching rows still waiting for a safety verdict.
//!
//! A safety batch dropped after repeated classifier failures leaves its rows
//! pending. The sweep picks them up again without a restart.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::application::services::ShortUrlService;

/// Calls [`ShortUrlService::requeue_pending`] every `period` until `stop`
/// flips to `true` or its sender goes away.
///
/// The first sweep runs one `period` after start.
pub async fn run_requeue_loop(
    service: Arc<ShortUrlService>,
    period: Duration,
    limit: i64,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }

        match service.requeue_pending(limit).await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "Re-queued pending short URLs"),
            Err(e) => tracing::warn!(error = %e, "Pending sweep failed"),
        }
    }

    tracing::info!("Pending sweep stopped");
}
