//! Handler for CSV bulk shortening.

use axum::{
    extract::{ConnectInfo, Multipart, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::net::SocketAddr;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

const FILE_FIELD: &str = "file";

/// Shortens every URL of an uploaded CSV file.
///
/// # Endpoint
///
/// `POST /api/bulk` (`multipart/form-data`, field `file`)
///
/// # Input
///
/// ```text
/// URI,QR
/// https://example.com,1
/// https://example.org,0
/// ```
///
/// `;`, tab and `|` are accepted as delimiters as well.
///
/// # Response
///
/// `201 Created`, `text/csv`, with `Location` set to the first short link:
///
/// ```text
/// URI,short_URI,QR,message,validation_status
/// https://example.com,http://localhost:3000/f684a3c4,http://localhost:3000/f684a3c4/qr,no_error,pending_validation
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if the `file` field is missing, the header is not
/// `URI,QR`, or a row does not have exactly two fields.
pub async fn bulk_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut content = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::bad_request("Invalid multipart body", json!({ "reason": e.to_string() }))
    })? {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field.bytes().await.map_err(|e| {
                AppError::bad_request("Failed to read upload", json!({ "reason": e.to_string() }))
            })?;
            content = Some(bytes);
            break;
        }
    }

    let content = content.ok_or_else(|| {
        AppError::bad_request("Missing CSV file", json!({ "field": FILE_FIELD }))
    })?;

    let ip = client_ip(&headers, addr, state.behind_proxy);
    let output = state.bulk_service.process_csv(&content, Some(ip)).await?;

    let mut response = (
        StatusCode::CREATED,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=output.csv"),
        ],
        output.content,
    )
        .into_response();

    if let Some(location) = output
        .first_short_url
        .and_then(|url| url.parse().ok())
    {
        response.headers_mut().insert(header::LOCATION, location);
    }

    Ok(response)
}
