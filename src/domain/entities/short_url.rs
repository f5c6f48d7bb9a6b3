//! Short URL entity and its safety state.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default HTTP status used for redirects.
pub const DEFAULT_REDIRECT_MODE: u16 = 307;

/// Where a short URL points and how the redirect is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirection {
    pub target: String,
    pub mode: u16,
}

impl Redirection {
    /// Temporary (307) redirection to `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            mode: DEFAULT_REDIRECT_MODE,
        }
    }
}

/// Metadata attached to a short URL.
///
/// `safe` stays `None` until the safe-browsing pipeline classifies the target.
/// `qr` holds the rendered PNG once the QR pipeline has produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortUrlProperties {
    pub ip: Option<String>,
    pub sponsor: Option<String>,
    pub safe: Option<bool>,
    pub owner: Option<String>,
    pub country: Option<String>,
    pub qr: Option<Vec<u8>>,
}

/// Classification state of a short URL target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyStatus {
    Pending,
    Safe,
    Unsafe,
}

impl SafetyStatus {
    pub fn from_flag(safe: Option<bool>) -> Self {
        match safe {
            None => SafetyStatus::Pending,
            Some(true) => SafetyStatus::Safe,
            Some(false) => SafetyStatus::Unsafe,
        }
    }
}

/// A stored short URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortUrl {
    pub hash: String,
    pub redirection: Redirection,
    pub created: DateTime<Utc>,
    pub properties: ShortUrlProperties,
}

impl ShortUrl {
    pub fn safety(&self) -> SafetyStatus {
        SafetyStatus::from_flag(self.properties.safe)
    }

    pub fn has_qr(&self) -> bool {
        self.properties.qr.is_some()
    }
}

/// Input for inserting a short URL. Rows always start unclassified and without a QR image.
#[derive(Debug, Clone)]
pub struct NewShortUrl {
    pub hash: String,
    pub redirection: Redirection,
    pub ip: Option<String>,
    pub sponsor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_url(safe: Option<bool>, qr: Option<Vec<u8>>) -> ShortUrl {
        ShortUrl {
            hash: "abcd1234".to_string(),
            redirection: Redirection::new("https://example.com"),
            created: Utc::now(),
            properties: ShortUrlProperties {
                safe,
                qr,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_redirection_defaults_to_temporary() {
        let redirection = Redirection::new("https://example.com");
        assert_eq!(redirection.mode, 307);
        assert_eq!(redirection.target, "https://example.com");
    }

    #[test]
    fn test_safety_states() {
        assert_eq!(short_url(None, None).safety(), SafetyStatus::Pending);
        assert_eq!(short_url(Some(true), None).safety(), SafetyStatus::Safe);
        assert_eq!(short_url(Some(false), None).safety(), SafetyStatus::Unsafe);
    }

    #[test]
    fn test_has_qr() {
        assert!(!short_url(Some(true), None).has_qr());
        assert!(short_url(Some(true), Some(vec![1, 2, 3])).has_qr());
    }

    #[test]
    fn test_safety_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SafetyStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
