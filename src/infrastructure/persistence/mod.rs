//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx runtime
//! queries mapped through `FromRow` row structs.
//!
//! # Repositories
//!
//! - [`PgShortUrlRepository`] - Short URL storage, classification and QR updates
//! - [`PgClickRepository`] - Click tracking and user-agent aggregates

pub mod pg_click_repository;
pub mod pg_short_url_repository;

pub use pg_click_repository::PgClickRepository;
pub use pg_short_url_repository::PgShortUrlRepository;
