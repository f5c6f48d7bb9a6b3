//! Outbound ports of the domain: the background pipeline and the URL classifier.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::events::{ClickEvent, QrCodeRequest, SafetyCheckRequest};
use crate::error::AppError;

/// Failure to hand work to the background pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("{0} queue is closed")]
    Closed(&'static str),

    #[error("{0} queue is full")]
    Full(&'static str),
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        AppError::unavailable(
            "Background processing is unavailable",
            json!({ "reason": e.to_string() }),
        )
    }
}

/// Snapshot of one pipeline queue, reported by health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHealth {
    pub name: &'static str,
    pub closed: bool,
    /// Free slots right now.
    pub available: usize,
    pub capacity: usize,
}

/// Entry point into the post-creation pipeline.
///
/// Safety checks and QR requests wait for queue capacity so that bursts of
/// creations slow down instead of losing work. Clicks are best effort: a full
/// queue drops the event rather than delaying the redirect.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineDispatcher: Send + Sync {
    async fn request_safety_check(&self, request: SafetyCheckRequest)
    -> Result<(), DispatchError>;

    async fn request_qr_code(&self, request: QrCodeRequest) -> Result<(), DispatchError>;

    fn record_click(&self, event: ClickEvent) -> Result<(), DispatchError>;

    fn queue_health(&self) -> Vec<QueueHealth>;
}

/// Errors raised by a safe-browsing classifier.
#[derive(Debug, thiserror::Error)]
pub enum SafeBrowsingError {
    #[error("Safe browsing request failed: {0}")]
    Transport(String),

    #[error("Safe browsing service answered with status {0}")]
    Status(u16),

    #[error("Unexpected safe browsing response: {0}")]
    Decode(String),
}

/// Classifies target URLs against a threat list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SafeBrowsingService: Send + Sync {
    /// Returns the subset of `urls` reported as threats. An empty result means
    /// every URL is considered safe.
    async fn find_threats(&self, urls: &[String]) -> Result<Vec<String>, SafeBrowsingError>;
}
