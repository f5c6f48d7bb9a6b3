//! Size-or-time batching for the safe-browsing stage.

use std::time::Duration;
use tokio::time::{Instant, timeout_at};

use super::inbox::Inbox;

/// When a batch is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Release as soon as this many items are collected.
    pub max_size: usize,
    /// Release a partial batch this long after its first item arrived.
    pub max_wait: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            max_size: 5,
            max_wait: Duration::from_secs(60),
        }
    }
}

/// Collects the next batch from `inbox`.
///
/// Waits indefinitely for the first item, then keeps collecting until the
/// batch holds `max_size` items, `max_wait` has elapsed since the first item,
/// or the inbox is closed. A partial batch is always released; `None` is
/// returned only when the inbox is closed and empty.
pub async fn next_batch<T>(inbox: &mut Inbox<T>, policy: &BatchPolicy) -> Option<Vec<T>> {
    let max_size = policy.max_size.max(1);

    let first = inbox.recv().await?;
    let deadline = Instant::now() + policy.max_wait;

    let mut batch = Vec::with_capacity(max_size);
    batch.push(first);

    while batch.len() < max_size {
        match timeout_at(deadline, inbox.recv()).await {
            Ok(Some(item)) => batch.push(item),
            Ok(None) | Err(_) => break,
        }
    }

    Some(batch)
}
