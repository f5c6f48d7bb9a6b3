//! Safe-browsing classifiers.
//!
//! - [`GoogleSafeBrowsing`] - Google Safe Browsing v4 lookup API
//! - [`NullSafeBrowsing`] - Fallback when no API key is configured

pub mod google;
pub mod null;

pub use google::{GoogleSafeBrowsing, GoogleSafeBrowsingSettings};
pub use null::NullSafeBrowsing;
