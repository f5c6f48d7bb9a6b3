//! User-agent parsing for click analytics.

use woothee::parser::Parser;

use crate::domain::entities::UserAgentInfo;

/// Extracts browser and platform names from a `User-Agent` header.
///
/// Values the parser cannot identify are reported as `None`.
pub fn parse_user_agent(user_agent: &str) -> UserAgentInfo {
    let result = Parser::new().parse(user_agent).unwrap_or_default();

    UserAgentInfo {
        browser: known(result.name),
        platform: known(result.os),
    }
}

fn known(value: &str) -> Option<String> {
    if value.is_empty() || value == "UNKNOWN" {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_desktop_chrome() {
        let info = parse_user_agent(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        );

        assert_eq!(info.browser.as_deref(), Some("Chrome"));
        assert_eq!(info.platform.as_deref(), Some("Windows 10"));
    }

    #[test]
    fn test_parses_firefox_on_linux() {
        let info = parse_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
        );

        assert_eq!(info.browser.as_deref(), Some("Firefox"));
        assert_eq!(info.platform.as_deref(), Some("Linux"));
    }

    #[test]
    fn test_unknown_agent() {
        let info = parse_user_agent("definitely-not-a-browser");

        assert!(info.browser.is_none());
        assert!(info.platform.is_none());
    }

    #[test]
    fn test_empty_agent() {
        let info = parse_user_agent("");

        assert!(info.browser.is_none());
        assert!(info.platform.is_none());
    }
}
