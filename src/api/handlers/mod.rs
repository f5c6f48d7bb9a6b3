//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod bulk;
pub mod fast_bulk;
pub mod health;
pub mod link_info;
pub mod redirect;
pub mod shorten;
pub mod stats;

pub use bulk::bulk_handler;
pub use fast_bulk::fast_bulk_handler;
pub use health::health_handler;
pub use link_info::link_info_handler;
pub use redirect::{qr_code_handler, redirect_handler};
pub use shorten::create_link_handler;
pub use stats::click_stats_handler;
