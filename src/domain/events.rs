//! Messages exchanged between request handlers and the background pipeline.
//!
//! Handlers produce requests ([`SafetyCheckRequest`], [`QrCodeRequest`],
//! [`ClickEvent`]); workers produce results ([`SafetyVerdict`], [`QrCodeReady`])
//! that the update stages write back to storage.

/// Asks the safe-browsing stage to classify `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyCheckRequest {
    pub hash: String,
    pub target: String,
}

/// Classification outcome for one target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub target: String,
    pub safe: bool,
}

/// Asks the QR stage to render `link` for the short URL `hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCodeRequest {
    pub hash: String,
    pub link: String,
}

/// A rendered QR image ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCodeReady {
    pub hash: String,
    pub png: Vec<u8>,
}

/// A served redirect, captured for asynchronous click analytics.
///
/// All client metadata is optional to handle missing headers gracefully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub hash: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

impl ClickEvent {
    pub fn new(
        hash: impl Into<String>,
        ip: Option<String>,
        user_agent: Option<&str>,
        referrer: Option<&str>,
    ) -> Self {
        Self {
            hash: hash.into(),
            ip,
            user_agent: user_agent.map(str::to_string),
            referrer: referrer.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_event_creation_full() {
        let event = ClickEvent::new(
            "abcd1234",
            Some("192.168.1.1".to_string()),
            Some("Mozilla/5.0"),
            Some("https://google.com"),
        );

        assert_eq!(event.hash, "abcd1234");
        assert_eq!(event.ip.as_deref(), Some("192.168.1.1"));
        assert_eq!(event.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(event.referrer.as_deref(), Some("https://google.com"));
    }

    #[test]
    fn test_click_event_creation_minimal() {
        let event = ClickEvent::new("xyz", None, None, None);

        assert_eq!(event.hash, "xyz");
        assert!(event.ip.is_none());
        assert!(event.user_agent.is_none());
        assert!(event.referrer.is_none());
    }
}
