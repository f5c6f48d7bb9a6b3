//! Utility functions shared across layers.
//!
//! - [`url_validator`] - HTTP(S) target validation
//! - [`hashing`] - Short key derivation
//! - [`link_builder`] - Public short / QR link construction
//! - [`csv_format`] - Bulk CSV delimiter detection and record writing
//! - [`user_agent`] - Browser and platform extraction
//! - [`client_ip`] - Client address resolution behind proxies

pub mod client_ip;
pub mod csv_format;
pub mod hashing;
pub mod link_builder;
pub mod url_validator;
pub mod user_agent;
