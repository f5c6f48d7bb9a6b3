//! Handler for click statistics.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::stats::ClickStatsResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns the latest click and browser / platform totals of a short URL.
///
/// # Endpoint
///
/// `GET /api/link/{id}/clicks`
///
/// # Response
///
/// ```json
/// {
///   "hash": "f684a3c4",
///   "created": "2024-01-15T10:30:00Z",
///   "properties": { "ip": "203.0.113.7", "browser": "Chrome", "platform": "Windows 10", ... },
///   "total_clicks": 42,
///   "browsers": [{ "name": "Chrome", "clicks": 30 }, { "name": "Firefox", "clicks": 12 }],
///   "platforms": [{ "name": "Windows 10", "clicks": 42 }]
/// }
/// ```
///
/// # Errors
///
/// - 404 if the hash doesn't exist or has no clicks
/// - 400 with `Retry-After` while the target is pending
/// - 403 if the target is unsafe
pub async fn click_stats_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClickStatsResponse>, AppError> {
    let stats = state.click_service.user_agent_info(&id).await?;
    Ok(Json(stats.into()))
}
