//! Background post-creation pipeline.
//!
//! Every stage is a bounded queue drained by a worker task:
//!
//! ```text
//! create ──▶ [safety requests] ──▶ batcher + classifier ──▶ [verdicts] ──▶ update safe flag
//! create ──▶ [qr requests] ──────▶ render pool ───────────▶ [qr images] ──▶ update qr column
//! redirect ▶ [clicks] ───────────▶ user-agent parse + save pool
//! ```
//!
//! Request queues are fed through [`PipelineHandle`]. Result queues are owned
//! by the stage producing into them, so they close once that stage finishes.
//! [`Pipeline::shutdown`] closes the request queues, lets every stage drain and
//! waits for the update stages to flush.

pub mod batcher;
pub mod click_worker;
pub mod inbox;
pub mod pool;
pub mod qr_worker;
pub mod requeue;
pub mod retry;
pub mod safe_browsing_worker;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::application::services::ClickService;
use crate::config::Config;
use crate::domain::events::{ClickEvent, QrCodeRequest, SafetyCheckRequest};
use crate::domain::ports::{DispatchError, PipelineDispatcher, QueueHealth, SafeBrowsingService};
use crate::domain::repositories::ShortUrlRepository;

pub use batcher::BatchPolicy;
use inbox::Inbox;

pub const SAFETY_QUEUE: &str = "safe_browsing";
pub const QR_QUEUE: &str = "qr";
pub const CLICK_QUEUE: &str = "clicks";

/// Queue sizes, batching and pool widths.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub safety_batch: BatchPolicy,
    pub safety_queue_capacity: usize,
    pub qr_queue_capacity: usize,
    pub qr_concurrency: usize,
    pub click_queue_capacity: usize,
    pub click_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            safety_batch: BatchPolicy::default(),
            safety_queue_capacity: 25,
            qr_queue_capacity: 25,
            qr_concurrency: 2,
            click_queue_capacity: 10_000,
            click_concurrency: 4,
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            safety_batch: BatchPolicy {
                max_size: config.safe_browsing_batch_size,
                max_wait: Duration::from_secs(config.safe_browsing_batch_window_secs),
            },
            safety_queue_capacity: config.safe_browsing_queue_capacity,
            qr_queue_capacity: config.qr_queue_capacity,
            qr_concurrency: config.qr_worker_concurrency,
            click_queue_capacity: config.click_queue_capacity,
            click_concurrency: config.click_worker_concurrency,
        }
    }
}

/// Collaborators the stages write through.
pub struct PipelineDeps {
    pub short_urls: Arc<dyn ShortUrlRepository>,
    pub safe_browsing: Arc<dyn SafeBrowsingService>,
    pub click_service: Arc<ClickService>,
}

/// Running pipeline: its stage tasks and the shutdown signal.
pub struct Pipeline {
    handle: PipelineHandle,
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Pipeline {
    /// Creates every queue and spawns every stage on the current runtime.
    pub fn spawn(config: PipelineConfig, deps: PipelineDeps) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);

        let (safety_tx, safety_rx) = mpsc::channel(config.safety_queue_capacity.max(1));
        let (verdict_tx, verdict_rx) = mpsc::channel(config.safety_queue_capacity.max(1));
        let (qr_tx, qr_rx) = mpsc::channel(config.qr_queue_capacity.max(1));
        let (qr_ready_tx, qr_ready_rx) = mpsc::channel(config.qr_queue_capacity.max(1));
        let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity.max(1));

        let tasks = vec![
            (
                "safe_browsing",
                tokio::spawn(safe_browsing_worker::run_safe_browsing_worker(
                    Inbox::with_shutdown(safety_rx, shutdown_rx.clone()),
                    config.safety_batch,
                    deps.short_urls.clone(),
                    deps.safe_browsing,
                    verdict_tx,
                )),
            ),
            (
                "safety_updates",
                tokio::spawn(safe_browsing_worker::run_safety_update_worker(
                    Inbox::new(verdict_rx),
                    deps.short_urls.clone(),
                )),
            ),
            (
                "qr",
                tokio::spawn(qr_worker::run_qr_worker(
                    Inbox::with_shutdown(qr_rx, shutdown_rx.clone()),
                    config.qr_concurrency,
                    deps.short_urls.clone(),
                    qr_ready_tx,
                )),
            ),
            (
                "qr_updates",
                tokio::spawn(qr_worker::run_qr_update_worker(
                    Inbox::new(qr_ready_rx),
                    deps.short_urls,
                )),
            ),
            (
                "clicks",
                tokio::spawn(click_worker::run_click_worker(
                    Inbox::with_shutdown(click_rx, shutdown_rx),
                    config.click_concurrency,
                    deps.click_service,
                )),
            ),
        ];

        tracing::info!(
            batch_size = config.safety_batch.max_size,
            batch_window_secs = config.safety_batch.max_wait.as_secs(),
            qr_concurrency = config.qr_concurrency,
            click_concurrency = config.click_concurrency,
            "Pipeline started"
        );

        Self {
            handle: PipelineHandle::new(safety_tx, qr_tx, click_tx),
            shutdown,
            tasks,
        }
    }

    /// Returns a producer handle; clone it freely.
    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Stops accepting work and waits up to `timeout` for every stage to drain.
    ///
    /// Returns `false` if the timeout elapsed first; remaining work is abandoned.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        tracing::info!("Draining pipeline");
        let _ = self.shutdown.send(true);
        drop(self.handle);

        let tasks = self.tasks;
        let drain = async move {
            for (stage, task) in tasks {
                if let Err(e) = task.await {
                    tracing::error!(stage, error = %e, "Pipeline stage panicked");
                }
            }
        };

        match tokio::time::timeout(timeout, drain).await {
            Ok(()) => {
                tracing::info!("Pipeline drained");
                true
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Pipeline did not drain in time"
                );
                false
            }
        }
    }
}

/// Producer side of the request queues.
#[derive(Clone)]
pub struct PipelineHandle {
    safety_tx: mpsc::Sender<SafetyCheckRequest>,
    qr_tx: mpsc::Sender<QrCodeRequest>,
    click_tx: mpsc::Sender<ClickEvent>,
}

impl PipelineHandle {
    /// Wraps existing queues; [`Pipeline::spawn`] wires the real ones.
    pub fn new(
        safety_tx: mpsc::Sender<SafetyCheckRequest>,
        qr_tx: mpsc::Sender<QrCodeRequest>,
        click_tx: mpsc::Sender<ClickEvent>,
    ) -> Self {
        Self {
            safety_tx,
            qr_tx,
            click_tx,
        }
    }
}

#[async_trait]
impl PipelineDispatcher for PipelineHandle {
    async fn request_safety_check(
        &self,
        request: SafetyCheckRequest,
    ) -> Result<(), DispatchError> {
        self.safety_tx
            .send(request)
            .await
            .map_err(|_| DispatchError::Closed(SAFETY_QUEUE))?;
        metrics::counter!("safelink_pipeline_enqueued_total", "queue" => SAFETY_QUEUE).increment(1);
        Ok(())
    }

    async fn request_qr_code(&self, request: QrCodeRequest) -> Result<(), DispatchError> {
        self.qr_tx
            .send(request)
            .await
            .map_err(|_| DispatchError::Closed(QR_QUEUE))?;
        metrics::counter!("safelink_pipeline_enqueued_total", "queue" => QR_QUEUE).increment(1);
        Ok(())
    }

    fn record_click(&self, event: ClickEvent) -> Result<(), DispatchError> {
        match self.click_tx.try_send(event) {
            Ok(()) => {
                metrics::counter!("safelink_pipeline_enqueued_total", "queue" => CLICK_QUEUE)
                    .increment(1);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                metrics::counter!("safelink_pipeline_dropped_total", "queue" => CLICK_QUEUE)
                    .increment(1);
                Err(DispatchError::Full(CLICK_QUEUE))
            }
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed(CLICK_QUEUE)),
        }
    }

    fn queue_health(&self) -> Vec<QueueHealth> {
        vec![
            queue_health(SAFETY_QUEUE, &self.safety_tx),
            queue_health(QR_QUEUE, &self.qr_tx),
            queue_health(CLICK_QUEUE, &self.click_tx),
        ]
    }
}

fn queue_health<T>(name: &'static str, tx: &mpsc::Sender<T>) -> QueueHealth {
    QueueHealth {
        name,
        closed: tx.is_closed(),
        available: tx.capacity(),
        capacity: tx.max_capacity(),
    }
}
