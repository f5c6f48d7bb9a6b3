//! Target URL validation.
//!
//! Only absolute `http` / `https` URLs with a host can be shortened. The URL is
//! otherwise kept exactly as submitted: its hash is computed over the raw text.

use url::Url;

/// Reasons a submitted URL is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must include a host")]
    MissingHost,
}

/// Validates that `input` is an absolute HTTP(S) URL.
///
/// Rejects `javascript:`, `data:`, `file:`, `ftp:` and every other scheme.
///
/// # Examples
///
/// ```
/// use safelink::utils::url_validator::validate_url;
///
/// assert!(validate_url("https://example.com/path").is_ok());
/// assert!(validate_url("ftp://example.com").is_err());
/// ```
pub fn validate_url(input: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(input).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlValidationError::UnsupportedProtocol),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com/a/b?c=d#frag").is_ok());
        assert_eq!(
            validate_url("https://example.com:8443/path")
                .unwrap()
                .port(),
            Some(8443)
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(
            validate_url("ftp://example.com/file").unwrap_err(),
            UrlValidationError::UnsupportedProtocol
        );
        assert_eq!(
            validate_url("javascript:alert(1)").unwrap_err(),
            UrlValidationError::UnsupportedProtocol
        );
        assert_eq!(
            validate_url("mailto:someone@example.com").unwrap_err(),
            UrlValidationError::UnsupportedProtocol
        );
    }

    #[test]
    fn test_rejects_relative_and_garbage() {
        assert!(matches!(
            validate_url("example.com"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(matches!(
            validate_url("not a url"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(matches!(
            validate_url(""),
            Err(UrlValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            UrlValidationError::UnsupportedProtocol.to_string(),
            "Only HTTP and HTTPS protocols are allowed"
        );
    }
}
