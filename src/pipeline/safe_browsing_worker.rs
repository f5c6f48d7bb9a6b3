//! Safe-browsing stage: batch, filter, classify, publish verdicts.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_retry::RetryIf;

use super::batcher::{BatchPolicy, next_batch};
use super::inbox::Inbox;
use super::retry::{backoff, is_transient, is_transient_lookup};
use crate::domain::events::{SafetyCheckRequest, SafetyVerdict};
use crate::domain::ports::SafeBrowsingService;
use crate::domain::repositories::ShortUrlRepository;

/// Classifies batches of pending targets.
///
/// Each batch is reduced to the distinct targets whose rows are still
/// unclassified, sent to the classifier in a single call and turned into one
/// [`SafetyVerdict`] per target. Transient classifier failures are retried;
/// when they persist, or the failure is permanent, the batch is dropped and
/// its rows stay pending until they are re-queued.
pub async fn run_safe_browsing_worker(
    mut inbox: Inbox<SafetyCheckRequest>,
    policy: BatchPolicy,
    short_urls: Arc<dyn ShortUrlRepository>,
    classifier: Arc<dyn SafeBrowsingService>,
    verdicts: mpsc::Sender<SafetyVerdict>,
) {
    while let Some(batch) = next_batch(&mut inbox, &policy).await {
        let received = batch.len();
        let targets = pending_targets(batch, short_urls.as_ref()).await;

        tracing::debug!(received, pending = targets.len(), "Safe browsing batch released");
        if targets.is_empty() {
            continue;
        }

        let lookup = RetryIf::spawn(
            backoff(),
            || classifier.find_threats(&targets),
            is_transient_lookup,
        );
        let threats = match lookup.await {
            Ok(threats) => threats,
            Err(e) => {
                tracing::error!(error = %e, targets = targets.len(), "Safe browsing lookup failed");
                metrics::counter!("safelink_safety_batches_failed_total").increment(1);
                continue;
            }
        };

        metrics::counter!("safelink_safety_batches_total").increment(1);

        for verdict in to_verdicts(targets, &threats) {
            if verdicts.send(verdict).await.is_err() {
                tracing::error!("Safety verdict queue closed, stopping safe browsing worker");
                return;
            }
        }
    }

    tracing::info!("Safe browsing worker stopped");
}

/// Writes verdicts back to storage, one target at a time.
pub async fn run_safety_update_worker(
    mut inbox: Inbox<SafetyVerdict>,
    short_urls: Arc<dyn ShortUrlRepository>,
) {
    while let Some(verdict) = inbox.recv().await {
        let result = RetryIf::spawn(
            backoff(),
            || short_urls.update_safe_status_by_target(&verdict.target, verdict.safe),
            is_transient,
        )
        .await;

        match result {
            Ok(updated) => {
                tracing::info!(
                    target_url = %verdict.target,
                    safe = verdict.safe,
                    updated,
                    "Safety verdict stored"
                );
                let outcome = if verdict.safe { "safe" } else { "unsafe" };
                metrics::counter!("safelink_safety_verdicts_total", "outcome" => outcome)
                    .increment(1);
            }
            Err(e) => {
                tracing::error!(target_url = %verdict.target, error = %e, "Failed to store safety verdict");
                metrics::counter!("safelink_safety_updates_failed_total").increment(1);
            }
        }
    }

    tracing::info!("Safety update worker stopped");
}

/// Distinct targets, in arrival order, whose rows are still unclassified.
///
/// Rows that disappeared or already carry a verdict are skipped. A failed
/// lookup keeps the request; verdicts are idempotent per target.
async fn pending_targets(
    batch: Vec<SafetyCheckRequest>,
    short_urls: &dyn ShortUrlRepository,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(batch.len());

    for request in batch {
        if seen.contains(&request.target) {
            continue;
        }

        let pending = match short_urls.find_by_hash(&request.hash).await {
            Ok(Some(row)) => row.properties.safe.is_none(),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(hash = %request.hash, error = %e, "Lookup failed, classifying anyway");
                true
            }
        };

        if pending {
            seen.insert(request.target.clone());
            targets.push(request.target);
        }
    }

    targets
}

fn to_verdicts(targets: Vec<String>, threats: &[String]) -> Vec<SafetyVerdict> {
    let threats: HashSet<&str> = threats.iter().map(String::as_str).collect();

    targets
        .into_iter()
        .map(|target| {
            let safe = !threats.contains(target.as_str());
            SafetyVerdict { target, safe }
        })
        .collect()
}
