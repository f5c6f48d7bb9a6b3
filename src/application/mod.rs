//! Application layer services implementing business logic.
//!
//! Services consume repository traits and the pipeline dispatcher port, and
//! provide a clean API for HTTP handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::short_url_service::ShortUrlService`] - Creation, safety-gated redirects, QR codes
//! - [`services::click_service::ClickService`] - Click logging and user-agent statistics
//! - [`services::bulk_service::BulkService`] - CSV and line-by-line bulk shortening

pub mod services;
