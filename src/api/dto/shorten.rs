//! DTOs for the link creation endpoint.

use serde::{Deserialize, Serialize};
use serde_with::{NoneAsEmptyString, serde_as};
use validator::Validate;

/// Form body of `POST /api/link`.
///
/// An empty `sponsor` field is treated as absent.
#[serde_as]
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkForm {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url: String,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[validate(length(max = 255))]
    pub sponsor: Option<String>,

    /// Render a QR code of the short link in the background.
    #[serde(default, rename = "qrRequest")]
    pub qr_request: bool,
}

/// Response of `POST /api/link`.
#[derive(Debug, Serialize)]
pub struct CreateLinkResponse {
    /// The short link.
    pub url: String,
    pub properties: CreatedLinkProperties,
}

#[derive(Debug, Serialize)]
pub struct CreatedLinkProperties {
    /// `null` until the target has been classified.
    pub safe: Option<bool>,
    /// QR link when one was requested.
    pub qr: Option<String>,
}
