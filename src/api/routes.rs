//! API route configuration.
//!
//! Routes are nested under `/api` and rate limited per client IP by
//! [`crate::api::middleware::rate_limit`].

use crate::api::handlers::{
    bulk_handler, click_stats_handler, create_link_handler, fast_bulk_handler, link_info_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Upper bound for uploaded CSV files.
const BULK_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// All API routes.
///
/// # Endpoints
///
/// - `POST /link`              - Create a short URL (form)
/// - `GET  /link/{id}`         - Short URL summary
/// - `GET  /link/{id}/clicks`  - Click statistics
/// - `POST /bulk`              - CSV bulk shortening (multipart)
/// - `GET  /fast-bulk`         - WebSocket bulk shortening, one line per message
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/link", post(create_link_handler))
        .route("/link/{id}", get(link_info_handler))
        .route("/link/{id}/clicks", get(click_stats_handler))
        .route(
            "/bulk",
            post(bulk_handler).layer(DefaultBodyLimit::max(BULK_BODY_LIMIT)),
        )
        .route("/fast-bulk", get(fast_bulk_handler))
}
