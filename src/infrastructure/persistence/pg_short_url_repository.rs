//! PostgreSQL implementation of the short URL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{
    DEFAULT_REDIRECT_MODE, NewShortUrl, Redirection, ShortUrl, ShortUrlProperties,
};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;

const SHORT_URL_COLUMNS: &str =
    "hash, target, mode, created, ip, sponsor, safe, owner, country, qr";

#[derive(Debug, FromRow)]
struct ShortUrlRow {
    hash: String,
    target: String,
    mode: i32,
    created: DateTime<Utc>,
    ip: Option<String>,
    sponsor: Option<String>,
    safe: Option<bool>,
    owner: Option<String>,
    country: Option<String>,
    qr: Option<Vec<u8>>,
}

impl From<ShortUrlRow> for ShortUrl {
    fn from(row: ShortUrlRow) -> Self {
        ShortUrl {
            hash: row.hash,
            redirection: Redirection {
                target: row.target,
                mode: u16::try_from(row.mode).unwrap_or(DEFAULT_REDIRECT_MODE),
            },
            created: row.created,
            properties: ShortUrlProperties {
                ip: row.ip,
                sponsor: row.sponsor,
                safe: row.safe,
                owner: row.owner,
                country: row.country,
                qr: row.qr,
            },
        }
    }
}

/// PostgreSQL repository for short URLs.
pub struct PgShortUrlRepository {
    pool: Arc<PgPool>,
}

impl PgShortUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShortUrlRepository for PgShortUrlRepository {
    async fn find_by_hash(&self, hash: &str) -> Result<Option<ShortUrl>, AppError> {
        let row = sqlx::query_as::<_, ShortUrlRow>(&format!(
            "SELECT {SHORT_URL_COLUMNS} FROM short_urls WHERE hash = $1"
        ))
        .bind(hash)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ShortUrl::from))
    }

    async fn save(&self, new_short_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let row = sqlx::query_as::<_, ShortUrlRow>(&format!(
            r#"
            INSERT INTO short_urls (hash, target, mode, ip, sponsor)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SHORT_URL_COLUMNS}
            "#
        ))
        .bind(&new_short_url.hash)
        .bind(&new_short_url.redirection.target)
        .bind(i32::from(new_short_url.redirection.mode))
        .bind(&new_short_url.ip)
        .bind(&new_short_url.sponsor)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn update_safe_status_by_target(
        &self,
        target: &str,
        safe: bool,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE short_urls SET safe = $2 WHERE target = $1")
            .bind(target)
            .bind(safe)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }

    async fn update_qr_code_by_hash(&self, hash: &str, qr: Vec<u8>) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE short_urls SET qr = $2 WHERE hash = $1")
            .bind(hash)
            .bind(qr)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_pending(&self, limit: i64) -> Result<Vec<ShortUrl>, AppError> {
        let rows = sqlx::query_as::<_, ShortUrlRow>(&format!(
            r#"
            SELECT {SHORT_URL_COLUMNS}
            FROM short_urls
            WHERE safe IS NULL
            ORDER BY created ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(ShortUrl::from).collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
