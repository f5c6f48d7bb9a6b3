//! Retry policy for pipeline side effects.

use std::time::Duration;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::domain::ports::SafeBrowsingError;
use crate::error::AppError;

/// Exponential backoff with jitter: roughly 50 ms, 500 ms, 5 s.
pub fn backoff() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(10)
        .factor(5)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(3)
}

/// Whether a failed storage write is worth retrying.
///
/// Only infrastructure failures are retried; a missing row or a constraint
/// violation will not fix itself.
pub fn is_transient(e: &AppError) -> bool {
    matches!(
        e,
        AppError::Internal { .. } | AppError::ServiceUnavailable { .. }
    )
}

/// Whether a failed classifier lookup is worth retrying.
///
/// Network failures, throttling and 5xx answers are retried. A rejected key,
/// a malformed request or an unreadable body is not.
pub fn is_transient_lookup(e: &SafeBrowsingError) -> bool {
    match e {
        SafeBrowsingError::Transport(_) => true,
        SafeBrowsingError::Status(status) => *status == 429 || (500..=599).contains(status),
        SafeBrowsingError::Decode(_) => false,
    }
}
