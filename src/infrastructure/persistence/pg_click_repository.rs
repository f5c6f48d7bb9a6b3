//! PostgreSQL implementation of the click repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{Click, ClickCount, ClickProperties, NewClick};
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;

#[derive(Debug, FromRow)]
struct ClickRow {
    id: i64,
    hash: String,
    created: DateTime<Utc>,
    ip: Option<String>,
    referrer: Option<String>,
    browser: Option<String>,
    platform: Option<String>,
    country: Option<String>,
}

impl From<ClickRow> for Click {
    fn from(row: ClickRow) -> Self {
        Click {
            id: row.id,
            hash: row.hash,
            created: row.created,
            properties: ClickProperties {
                ip: row.ip,
                referrer: row.referrer,
                browser: row.browser,
                platform: row.platform,
                country: row.country,
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct ClickCountRow {
    name: Option<String>,
    clicks: i64,
}

/// PostgreSQL repository for click tracking and user-agent aggregates.
pub struct PgClickRepository {
    pool: Arc<PgPool>,
}

impl PgClickRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    // Column names come from a fixed set, never from input.
    async fn count_grouped(&self, column: &str, hash: &str) -> Result<Vec<ClickCount>, AppError> {
        let rows = sqlx::query_as::<_, ClickCountRow>(&format!(
            r#"
            SELECT {column} AS name, COUNT(*) AS clicks
            FROM clicks
            WHERE hash = $1
            GROUP BY {column}
            ORDER BY clicks DESC, name ASC NULLS LAST
            "#
        ))
        .bind(hash)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ClickCount {
                name: r.name,
                clicks: r.clicks,
            })
            .collect())
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn save(&self, new_click: NewClick) -> Result<Click, AppError> {
        let p = new_click.properties;
        let row = sqlx::query_as::<_, ClickRow>(
            r#"
            INSERT INTO clicks (hash, ip, referrer, browser, platform, country)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, hash, created, ip, referrer, browser, platform, country
            "#,
        )
        .bind(&new_click.hash)
        .bind(p.ip)
        .bind(p.referrer)
        .bind(p.browser)
        .bind(p.platform)
        .bind(p.country)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find_latest_by_hash(&self, hash: &str) -> Result<Option<Click>, AppError> {
        let row = sqlx::query_as::<_, ClickRow>(
            r#"
            SELECT id, hash, created, ip, referrer, browser, platform, country
            FROM clicks
            WHERE hash = $1
            ORDER BY created DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(hash)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Click::from))
    }

    async fn count_by_browser(&self, hash: &str) -> Result<Vec<ClickCount>, AppError> {
        self.count_grouped("browser", hash).await
    }

    async fn count_by_platform(&self, hash: &str) -> Result<Vec<ClickCount>, AppError> {
        self.count_grouped("platform", hash).await
    }

    async fn count_by_hash(&self, hash: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE hash = $1")
            .bind(hash)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }
}
