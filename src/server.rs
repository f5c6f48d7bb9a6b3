//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, the background pipeline, and the Axum
//! server lifecycle including graceful shutdown.

use crate::application::services::{BulkService, ClickService, ShortUrlService};
use crate::config::Config;
use crate::domain::ports::{PipelineDispatcher, SafeBrowsingService};
use crate::domain::repositories::{ClickRepository, ShortUrlRepository};
use crate::infrastructure::persistence::{PgClickRepository, PgShortUrlRepository};
use crate::infrastructure::safe_browsing::{GoogleSafeBrowsing, NullSafeBrowsing};
use crate::pipeline::requeue::run_requeue_loop;
use crate::pipeline::{Pipeline, PipelineConfig, PipelineDeps};
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::link_builder::LinkBuilder;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Rows re-dispatched for classification per sweep.
const REQUEUE_LIMIT: i64 = 10_000;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Safe-browsing classifier (or NullSafeBrowsing fallback)
/// - Background pipeline (safe browsing, QR, clicks)
/// - Periodic sweep of rows still pending classification
/// - Axum HTTP server
///
/// On SIGINT / SIGTERM the server stops accepting requests, then the pipeline
/// drains its queues within `SHUTDOWN_TIMEOUT_SECS`.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let safe_browsing: Arc<dyn SafeBrowsingService> = match config.safe_browsing_settings() {
        Some(settings) => {
            tracing::info!("Safe browsing enabled ({})", settings.endpoint);
            Arc::new(GoogleSafeBrowsing::new(settings)?)
        }
        None => {
            tracing::warn!("SAFE_BROWSING_API_KEY not set, using NullSafeBrowsing");
            Arc::new(NullSafeBrowsing::new())
        }
    };

    let pool = Arc::new(pool);
    let short_urls: Arc<dyn ShortUrlRepository> =
        Arc::new(PgShortUrlRepository::new(pool.clone()));
    let clicks: Arc<dyn ClickRepository> = Arc::new(PgClickRepository::new(pool.clone()));

    let click_service = Arc::new(ClickService::new(clicks, short_urls.clone()));

    let pipeline = Pipeline::spawn(
        PipelineConfig::from(&config),
        PipelineDeps {
            short_urls: short_urls.clone(),
            safe_browsing,
            click_service: click_service.clone(),
        },
    );
    let dispatcher: Arc<dyn PipelineDispatcher> = Arc::new(pipeline.handle());

    let short_url_service = Arc::new(ShortUrlService::new(
        short_urls.clone(),
        dispatcher.clone(),
        LinkBuilder::new(&config.base_url),
    ));

    if config.requeue_pending_on_startup {
        let service = short_url_service.clone();
        tokio::spawn(async move {
            match service.requeue_pending(REQUEUE_LIMIT).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "Re-queued pending short URLs"),
                Err(e) => tracing::error!(error = %e, "Failed to re-queue pending short URLs"),
            }
        });
    }

    let (requeue_stop, requeue_stop_rx) = watch::channel(false);
    if let Some(period) = config.requeue_interval() {
        tokio::spawn(run_requeue_loop(
            short_url_service.clone(),
            period,
            REQUEUE_LIMIT,
            requeue_stop_rx,
        ));
    }

    let bulk_service = Arc::new(BulkService::new(
        short_url_service.clone(),
        config.bulk_concurrency,
    ));

    let state = AppState {
        short_url_service,
        click_service,
        bulk_service,
        dispatcher,
        short_urls,
        behind_proxy: config.behind_proxy,
        fast_bulk_concurrency: config.bulk_concurrency,
    };

    let app = app_router(state, config.behind_proxy)?;

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("HTTP server stopped");
    let _ = requeue_stop.send(true);
    pipeline.shutdown(config.shutdown_timeout()).await;

    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
