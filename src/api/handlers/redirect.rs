//! Handlers for short URL redirect and QR image.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::net::SocketAddr;

use crate::application::services::ClientInfo;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Redirects a short URL to its target.
///
/// # Endpoint
///
/// `GET /{id}`
///
/// # Safety gate
///
/// Only targets classified safe are served. While classification is pending
/// the response is `400` with `Retry-After`; unsafe targets get `403`.
///
/// # Click Tracking
///
/// A click event is queued for every served redirect. If the queue is full the
/// click is dropped (fire-and-forget) and the redirect still succeeds.
///
/// # Errors
///
/// Returns 404 Not Found if the hash doesn't exist.
pub async fn redirect_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, AppError> {
    let client = ClientInfo {
        ip: Some(client_ip(&headers, addr, state.behind_proxy)),
        user_agent: header_string(&headers, header::USER_AGENT),
        referrer: header_string(&headers, header::REFERER),
    };

    let redirection = state.short_url_service.redirect_to(&id, client).await?;

    let status = StatusCode::from_u16(redirection.mode).unwrap_or(StatusCode::TEMPORARY_REDIRECT);
    let location = HeaderValue::from_str(&redirection.target).map_err(|_| {
        AppError::internal(
            "Stored target is not a valid header value",
            json!({ "hash": id }),
        )
    })?;

    Ok((status, [(header::LOCATION, location)]).into_response())
}

/// Returns the QR code (PNG) of a short URL.
///
/// # Endpoint
///
/// `GET /{id}/qr`
///
/// # Errors
///
/// - 404 if the hash doesn't exist
/// - 400 with `Retry-After` while the target is pending or the image is not rendered yet
/// - 403 if the target is unsafe
pub async fn qr_code_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let png = state.short_url_service.qr_code(&id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        png,
    ))
}
