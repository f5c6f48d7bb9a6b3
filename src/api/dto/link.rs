//! DTOs for the short URL summary endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::{Redirection, SafetyStatus, ShortUrl};
use crate::utils::link_builder::LinkBuilder;

/// Response of `GET /api/link/{id}`.
#[derive(Debug, Serialize)]
pub struct LinkInfoResponse {
    pub hash: String,
    pub url: String,
    pub redirection: Redirection,
    pub created: DateTime<Utc>,
    pub status: SafetyStatus,
    pub properties: LinkInfoProperties,
}

#[derive(Debug, Serialize)]
pub struct LinkInfoProperties {
    pub ip: Option<String>,
    pub sponsor: Option<String>,
    pub safe: Option<bool>,
    pub owner: Option<String>,
    pub country: Option<String>,
    /// QR link once an image has been rendered.
    pub qr: Option<String>,
}

impl LinkInfoResponse {
    pub fn new(short_url: ShortUrl, links: &LinkBuilder) -> Self {
        let status = short_url.safety();
        let qr = short_url
            .has_qr()
            .then(|| links.qr_link(&short_url.hash));
        let p = short_url.properties;

        Self {
            url: links.link(&short_url.hash),
            hash: short_url.hash,
            redirection: short_url.redirection,
            created: short_url.created,
            status,
            properties: LinkInfoProperties {
                ip: p.ip,
                sponsor: p.sponsor,
                safe: p.safe,
                owner: p.owner,
                country: p.country,
                qr,
            },
        }
    }
}
