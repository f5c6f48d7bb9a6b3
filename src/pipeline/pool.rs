//! Bounded worker pool draining a stage inbox.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::inbox::Inbox;

/// Runs `handler` for every message of `inbox`, at most `concurrency` at a time.
///
/// A message is only taken from the queue once a slot is free, so the queue
/// itself provides backpressure to producers. Returns after the inbox is
/// closed and every in-flight task has finished.
pub async fn run_pool<T, F, Fut>(
    mut inbox: Inbox<T>,
    concurrency: usize,
    stage: &'static str,
    handler: F,
) where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    loop {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let Some(message) = inbox.recv().await else {
            break;
        };

        let work = handler(message);
        tasks.spawn(async move {
            let _permit = permit;
            work.await;
        });

        while let Some(result) = tasks.try_join_next() {
            log_task_result(stage, result);
        }
    }

    while let Some(result) = tasks.join_next().await {
        log_task_result(stage, result);
    }

    tracing::info!(stage, "Worker pool stopped");
}

fn log_task_result(stage: &'static str, result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(stage, error = %e, "Pipeline task panicked");
        metrics::counter!("safelink_pipeline_task_panics_total", "stage" => stage).increment(1);
    }
}
