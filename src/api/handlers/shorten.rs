//! Handler for link creation.

use axum::{
    Form, Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use std::net::SocketAddr;
use validator::Validate;

use crate::api::dto::shorten::{CreateLinkForm, CreateLinkResponse, CreatedLinkProperties};
use crate::application::services::CreateShortUrlData;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Creates (or returns) the short URL of a target.
///
/// # Endpoint
///
/// `POST /api/link` (`application/x-www-form-urlencoded`)
///
/// # Request Body
///
/// ```text
/// url=https://example.com&sponsor=acme&qrRequest=true
/// ```
///
/// # Response
///
/// `201 Created` with `Location` set to the short link:
///
/// ```json
/// {
///   "url": "http://localhost:3000/f684a3c4",
///   "properties": { "safe": null, "qr": "http://localhost:3000/f684a3c4/qr" }
/// }
/// ```
///
/// The short link is usable once the safe-browsing check has finished.
///
/// # Errors
///
/// - 400 if the URL is not an absolute HTTP(S) URL
/// - 409 on a hash collision with a different target
/// - 503 if the background pipeline is shut down
pub async fn create_link_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Form(form): Form<CreateLinkForm>,
) -> Result<impl IntoResponse, AppError> {
    form.validate()?;

    let data = CreateShortUrlData {
        ip: Some(client_ip(&headers, addr, state.behind_proxy)),
        sponsor: form.sponsor,
    };

    let short_url = state
        .short_url_service
        .create(&form.url, form.qr_request, data)
        .await?;

    let links = state.short_url_service.links();
    let url = links.link(&short_url.hash);
    let response = CreateLinkResponse {
        properties: CreatedLinkProperties {
            safe: short_url.properties.safe,
            qr: form.qr_request.then(|| links.qr_link(&short_url.hash)),
        },
        url: url.clone(),
    };

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, url)],
        Json(response),
    ))
}
