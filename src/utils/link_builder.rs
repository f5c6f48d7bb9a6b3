//! Public link construction.

/// Builds public URLs for short keys from the configured base URL.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base_url: String,
}

impl LinkBuilder {
    /// Creates a builder; trailing slashes on `base_url` are ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{hash}`
    pub fn link(&self, hash: &str) -> String {
        format!("{}/{}", self.base_url, hash)
    }

    /// `{base}/{hash}/qr`
    pub fn qr_link(&self, hash: &str) -> String {
        format!("{}/{}/qr", self.base_url, hash)
    }
}
