//! Click entity representing a single served redirect.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Client details captured with a click.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClickProperties {
    pub ip: Option<String>,
    pub referrer: Option<String>,
    pub browser: Option<String>,
    pub platform: Option<String>,
    pub country: Option<String>,
}

/// A recorded redirect through a short URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Click {
    pub id: i64,
    pub hash: String,
    pub created: DateTime<Utc>,
    pub properties: ClickProperties,
}

/// Input data for recording a click. The timestamp is set by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClick {
    pub hash: String,
    pub properties: ClickProperties,
}

/// Browser and platform parsed from a `User-Agent` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserAgentInfo {
    pub browser: Option<String>,
    pub platform: Option<String>,
}

/// Number of clicks sharing one browser or platform value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickCount {
    /// `None` groups clicks whose value could not be determined.
    pub name: Option<String>,
    pub clicks: i64,
}
