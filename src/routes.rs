//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{id}`        - Short link redirect
//! - `GET  /{id}/qr`     - QR code image of the short link
//! - `GET  /health`      - Health check: DB and pipeline queues
//! - `/api/*`            - REST API and the fast-bulk WebSocket (rate limited)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket (configurable for proxy deployments)
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, qr_code_handler, redirect_handler};
use crate::api::middleware::{rate_limit, tracing};
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `behind_proxy` - when `true`, rate limiting reads client IP from
///   `X-Forwarded-For` / `X-Real-IP` headers instead of the peer socket address;
///   enable only when the service runs behind a trusted reverse proxy
///
/// # Errors
///
/// Returns an error if the rate limiter settings are rejected.
pub fn app_router(state: AppState, behind_proxy: bool) -> anyhow::Result<NormalizePath<Router>> {
    let api_router = if behind_proxy {
        api::routes::api_routes().layer(rate_limit::proxy_layer()?)
    } else {
        api::routes::api_routes().layer(rate_limit::layer()?)
    };

    let router = Router::new()
        .route("/{id}", get(redirect_handler))
        .route("/{id}/qr", get(qr_code_handler))
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .with_state(state)
        .layer(tracing::layer());

    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}
