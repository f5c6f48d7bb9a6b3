//! Classifier used when no safe-browsing API key is configured.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{SafeBrowsingError, SafeBrowsingService};

/// A classifier that reports every URL as safe.
///
/// Lets development setups run the full pipeline without credentials.
pub struct NullSafeBrowsing;

impl NullSafeBrowsing {
    pub fn new() -> Self {
        debug!("Using NullSafeBrowsing (every target is classified safe)");
        Self
    }
}

impl Default for NullSafeBrowsing {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SafeBrowsingService for NullSafeBrowsing {
    async fn find_threats(&self, _urls: &[String]) -> Result<Vec<String>, SafeBrowsingError> {
        Ok(Vec::new())
    }
}
