//! Business logic services for the application layer.

pub mod bulk_service;
pub mod click_service;
pub mod short_url_service;

pub use bulk_service::{BulkCsvOutput, BulkService};
pub use click_service::{ClickService, ClickStats};
pub use short_url_service::{ClientInfo, CreateShortUrlData, ShortUrlService};
