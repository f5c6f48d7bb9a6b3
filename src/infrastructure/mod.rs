//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`persistence`] - PostgreSQL repository implementations
//! - [`safe_browsing`] - URL threat classifiers
//! - [`qr_code`] - PNG QR code rendering

pub mod persistence;
pub mod qr_code;
pub mod safe_browsing;
