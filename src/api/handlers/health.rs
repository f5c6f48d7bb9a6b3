//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};
use std::collections::BTreeMap;

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::domain::ports::QueueHealth;
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Database**: `SELECT 1` through the short URL repository
/// 2. **Queues**: Each pipeline queue is open; reports free slots
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "queues": {
///       "clicks": { "status": "ok", "message": "Available: 10000/10000" },
///       "qr": { "status": "ok", "message": "Available: 25/25" },
///       "safe_browsing": { "status": "ok", "message": "Available: 25/25" }
///     }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = match state.short_urls.ping().await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(format!("Database error: {}", e)),
    };

    let queues: BTreeMap<String, CheckStatus> = state
        .dispatcher
        .queue_health()
        .into_iter()
        .map(|q| (q.name.to_string(), check_queue(&q)))
        .collect();

    let all_healthy = database.is_ok() && queues.values().all(CheckStatus::is_ok);

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { database, queues },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

fn check_queue(queue: &QueueHealth) -> CheckStatus {
    if queue.closed {
        CheckStatus::error(format!("{} queue is closed", queue.name))
    } else {
        CheckStatus::ok(format!("Available: {}/{}", queue.available, queue.capacity))
    }
}
