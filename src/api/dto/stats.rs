//! DTOs for click statistics of a short URL.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::services::ClickStats;
use crate::domain::entities::{ClickCount, ClickProperties};

/// Response of `GET /api/link/{id}/clicks`.
///
/// `created` and `properties` describe the most recent click.
#[derive(Debug, Serialize)]
pub struct ClickStatsResponse {
    pub hash: String,
    pub created: DateTime<Utc>,
    pub properties: ClickProperties,
    pub total_clicks: i64,
    pub browsers: Vec<ClickCount>,
    pub platforms: Vec<ClickCount>,
}

impl From<ClickStats> for ClickStatsResponse {
    fn from(stats: ClickStats) -> Self {
        Self {
            hash: stats.hash,
            created: stats.created,
            properties: stats.properties,
            total_clicks: stats.total_clicks,
            browsers: stats.browsers,
            platforms: stats.platforms,
        }
    }
}
