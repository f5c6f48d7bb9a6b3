//! QR stage: render images for short URLs and store them.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_retry::RetryIf;

use super::inbox::Inbox;
use super::pool::run_pool;
use super::retry::{backoff, is_transient};
use crate::domain::events::{QrCodeReady, QrCodeRequest};
use crate::domain::repositories::ShortUrlRepository;
use crate::infrastructure::qr_code::render_png;

/// Renders QR images with up to `concurrency` requests in flight.
///
/// Requests for rows that are gone or already have an image are skipped.
/// Rendering runs on the blocking thread pool.
pub async fn run_qr_worker(
    inbox: Inbox<QrCodeRequest>,
    concurrency: usize,
    short_urls: Arc<dyn ShortUrlRepository>,
    ready: mpsc::Sender<QrCodeReady>,
) {
    run_pool(inbox, concurrency, "qr", move |request| {
        let short_urls = short_urls.clone();
        let ready = ready.clone();
        async move { process_request(request, short_urls.as_ref(), &ready).await }
    })
    .await;
}

async fn process_request(
    request: QrCodeRequest,
    short_urls: &dyn ShortUrlRepository,
    ready: &mpsc::Sender<QrCodeReady>,
) {
    match short_urls.find_by_hash(&request.hash).await {
        Ok(Some(row)) if row.has_qr() => {
            tracing::debug!(hash = %request.hash, "QR code already present, skipping");
            return;
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(hash = %request.hash, "QR requested for unknown short URL");
            return;
        }
        Err(e) => {
            tracing::warn!(hash = %request.hash, error = %e, "Lookup failed, rendering anyway");
        }
    }

    let link = request.link.clone();
    let png = match tokio::task::spawn_blocking(move || render_png(&link)).await {
        Ok(Ok(png)) => png,
        Ok(Err(e)) => {
            tracing::error!(hash = %request.hash, error = %e, "QR rendering failed");
            metrics::counter!("safelink_qr_failed_total").increment(1);
            return;
        }
        Err(e) => {
            tracing::error!(hash = %request.hash, error = %e, "QR rendering task failed");
            metrics::counter!("safelink_qr_failed_total").increment(1);
            return;
        }
    };

    if ready
        .send(QrCodeReady {
            hash: request.hash,
            png,
        })
        .await
        .is_err()
    {
        tracing::error!("QR update queue closed, dropping rendered image");
    }
}

/// Stores rendered images.
pub async fn run_qr_update_worker(
    mut inbox: Inbox<QrCodeReady>,
    short_urls: Arc<dyn ShortUrlRepository>,
) {
    while let Some(ready) = inbox.recv().await {
        let result = RetryIf::spawn(
            backoff(),
            || short_urls.update_qr_code_by_hash(&ready.hash, ready.png.clone()),
            is_transient,
        )
        .await;

        match result {
            Ok(true) => {
                tracing::info!(hash = %ready.hash, bytes = ready.png.len(), "QR code stored");
                metrics::counter!("safelink_qr_stored_total").increment(1);
            }
            Ok(false) => {
                tracing::warn!(hash = %ready.hash, "Short URL vanished before its QR code was stored");
            }
            Err(e) => {
                tracing::error!(hash = %ready.hash, error = %e, "Failed to store QR code");
                metrics::counter!("safelink_qr_failed_total").increment(1);
            }
        }
    }

    tracing::info!("QR update worker stopped");
}
