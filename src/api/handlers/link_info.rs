//! Handler for the short URL summary.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::link::LinkInfoResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns a short URL with its metadata, whatever its safety state.
///
/// # Endpoint
///
/// `GET /api/link/{id}`
///
/// # Errors
///
/// Returns 404 Not Found if the hash doesn't exist.
pub async fn link_info_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LinkInfoResponse>, AppError> {
    let short_url = state.short_url_service.summary(&id).await?;

    Ok(Json(LinkInfoResponse::new(
        short_url,
        state.short_url_service.links(),
    )))
}
