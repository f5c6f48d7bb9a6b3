//! Repository trait for short URL data access.

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for short URLs.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgShortUrlRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortUrlRepository: Send + Sync {
    /// Finds a short URL by its hash.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_hash(&self, hash: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Inserts a new, unclassified short URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the hash is already stored.
    /// Returns [`AppError::Internal`] on database errors.
    async fn save(&self, new_short_url: NewShortUrl) -> Result<ShortUrl, AppError>;

    /// Records the safe-browsing verdict for every row pointing at `target`.
    ///
    /// Returns the number of rows updated.
    async fn update_safe_status_by_target(&self, target: &str, safe: bool)
    -> Result<u64, AppError>;

    /// Stores the rendered QR image for `hash`.
    ///
    /// Returns `false` when no row matches.
    async fn update_qr_code_by_hash(&self, hash: &str, qr: Vec<u8>) -> Result<bool, AppError>;

    /// Lists rows still waiting for classification, oldest first.
    async fn find_pending(&self, limit: i64) -> Result<Vec<ShortUrl>, AppError>;

    /// Lightweight connectivity probe used by health checks.
    async fn ping(&self) -> Result<(), AppError>;
}
