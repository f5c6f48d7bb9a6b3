//! Click stage: parse user agents and persist clicks.

use std::sync::Arc;
use tokio_retry::RetryIf;

use super::inbox::Inbox;
use super::pool::run_pool;
use super::retry::{backoff, is_transient};
use crate::application::services::ClickService;
use crate::domain::events::ClickEvent;

/// Persists click events with up to `concurrency` writes in flight.
///
/// Transient storage failures are retried with backoff; a click that still
/// cannot be stored is logged and counted, never re-queued.
pub async fn run_click_worker(
    inbox: Inbox<ClickEvent>,
    concurrency: usize,
    click_service: Arc<ClickService>,
) {
    run_pool(inbox, concurrency, "clicks", move |event| {
        let click_service = click_service.clone();
        async move {
            let hash = event.hash.clone();
            let result = RetryIf::spawn(
                backoff(),
                || click_service.log_click(event.clone()),
                is_transient,
            )
            .await;

            match result {
                Ok(click) => {
                    tracing::debug!(hash = %click.hash, id = click.id, "Click recorded");
                    metrics::counter!("safelink_clicks_recorded_total").increment(1);
                }
                Err(e) => {
                    tracing::error!(hash = %hash, error = %e, "Failed to record click");
                    metrics::counter!("safelink_clicks_failed_total").increment(1);
                }
            }
        }
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Click, ClickProperties};
    use crate::domain::repositories::{MockClickRepository, MockShortUrlRepository};
    use crate::error::AppError;
    use chrono::Utc;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_persists_parsed_clicks() {
        let (tx, rx) = mpsc::channel(8);

        let mut clicks = MockClickRepository::new();
        clicks
            .expect_save()
            .withf(|c| {
                c.hash == "abcd1234"
                    && c.properties.browser.as_deref() == Some("Firefox")
                    && c.properties.ip.as_deref() == Some("10.0.0.1")
            })
            .times(1)
            .returning(|c| {
                Ok(Click {
                    id: 1,
                    hash: c.hash,
                    created: Utc::now(),
                    properties: c.properties,
                })
            });

        let service = Arc::new(ClickService::new(
            Arc::new(clicks),
            Arc::new(MockShortUrlRepository::new()),
        ));

        tx.send(ClickEvent::new(
            "abcd1234",
            Some("10.0.0.1".to_string()),
            Some("Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0"),
            None,
        ))
        .await
        .unwrap();
        drop(tx);

        run_click_worker(Inbox::new(rx), 4, service).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_permanent_failures() {
        let (tx, rx) = mpsc::channel(8);

        let mut clicks = MockClickRepository::new();
        clicks
            .expect_save()
            .times(1)
            .returning(|_| Err(AppError::bad_request("unknown hash", json!({}))));

        let service = Arc::new(ClickService::new(
            Arc::new(clicks),
            Arc::new(MockShortUrlRepository::new()),
        ));

        tx.send(ClickEvent::new("gone", None, None, None))
            .await
            .unwrap();
        drop(tx);

        run_click_worker(Inbox::new(rx), 1, service).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let (tx, rx) = mpsc::channel(8);

        let mut clicks = MockClickRepository::new();
        let mut seq = mockall::Sequence::new();
        clicks
            .expect_save()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::internal("db", json!({}))));
        clicks
            .expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|c| {
                Ok(Click {
                    id: 7,
                    hash: c.hash,
                    created: Utc::now(),
                    properties: ClickProperties::default(),
                })
            });

        let service = Arc::new(ClickService::new(
            Arc::new(clicks),
            Arc::new(MockShortUrlRepository::new()),
        ));

        tx.send(ClickEvent::new("abcd1234", None, None, None))
            .await
            .unwrap();
        drop(tx);

        run_click_worker(Inbox::new(rx), 1, service).await;
    }
}
