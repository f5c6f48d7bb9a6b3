//! Repository trait for click data access.

use crate::domain::entities::{Click, ClickCount, NewClick};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for recorded clicks.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgClickRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Persists a click.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the short URL does not exist.
    /// Returns [`AppError::Internal`] on database errors.
    async fn save(&self, new_click: NewClick) -> Result<Click, AppError>;

    /// Returns the most recent click for `hash`, if any.
    async fn find_latest_by_hash(&self, hash: &str) -> Result<Option<Click>, AppError>;

    /// Click totals for `hash` grouped by browser, most frequent first.
    async fn count_by_browser(&self, hash: &str) -> Result<Vec<ClickCount>, AppError>;

    /// Click totals for `hash` grouped by platform, most frequent first.
    async fn count_by_platform(&self, hash: &str) -> Result<Vec<ClickCount>, AppError>;

    /// Total clicks recorded for `hash`.
    async fn count_by_hash(&self, hash: &str) -> Result<i64, AppError>;
}
