//! Core domain entities.
//!
//! - [`ShortUrl`] - A target URL stored under its hash, with safety and QR state
//! - [`Click`] - A served redirect with parsed client details
//!
//! Creation inputs live in separate structs ([`NewShortUrl`], [`NewClick`]).

pub mod click;
pub mod short_url;

pub use click::{Click, ClickCount, ClickProperties, NewClick, UserAgentInfo};
pub use short_url::{
    DEFAULT_REDIRECT_MODE, NewShortUrl, Redirection, SafetyStatus, ShortUrl, ShortUrlProperties,
};
