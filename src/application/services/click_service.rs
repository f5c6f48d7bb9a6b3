//! Click recording and user-agent statistics.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;

use super::short_url_service::ensure_safe;
use crate::domain::entities::{Click, ClickCount, ClickProperties, NewClick};
use crate::domain::events::ClickEvent;
use crate::domain::repositories::{ClickRepository, ShortUrlRepository};
use crate::error::AppError;
use crate::utils::user_agent::parse_user_agent;

/// User-agent statistics for one short URL.
#[derive(Debug, Clone)]
pub struct ClickStats {
    pub hash: String,
    /// Time of the latest click.
    pub created: DateTime<Utc>,
    /// Client details of the latest click.
    pub properties: ClickProperties,
    pub total_clicks: i64,
    pub browsers: Vec<ClickCount>,
    pub platforms: Vec<ClickCount>,
}

/// Service for recording clicks and reporting on them.
pub struct ClickService {
    clicks: Arc<dyn ClickRepository>,
    short_urls: Arc<dyn ShortUrlRepository>,
}

impl ClickService {
    pub fn new(clicks: Arc<dyn ClickRepository>, short_urls: Arc<dyn ShortUrlRepository>) -> Self {
        Self { clicks, short_urls }
    }

    /// Parses the event's user agent and stores the click.
    ///
    /// Called by the click worker, not by request handlers.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the short URL does not exist.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn log_click(&self, event: ClickEvent) -> Result<Click, AppError> {
        let user_agent = event
            .user_agent
            .as_deref()
            .map(parse_user_agent)
            .unwrap_or_default();

        let new_click = NewClick {
            hash: event.hash,
            properties: ClickProperties {
                ip: event.ip,
                referrer: event.referrer,
                browser: user_agent.browser,
                platform: user_agent.platform,
                country: None,
            },
        };

        self.clicks.save(new_click).await
    }

    /// Returns the latest click and per-browser / per-platform totals.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the short URL is unknown or has no clicks
    /// - [`AppError::RetryAfter`] while the target is still being classified
    /// - [`AppError::Forbidden`] if the target was classified as unsafe
    pub async fn user_agent_info(&self, hash: &str) -> Result<ClickStats, AppError> {
        let short_url = self
            .short_urls
            .find_by_hash(hash)
            .await?
            .ok_or_else(|| AppError::not_found("Short URL not found", json!({ "hash": hash })))?;

        let latest = self
            .clicks
            .find_latest_by_hash(hash)
            .await?
            .ok_or_else(|| {
                AppError::not_found("No clicks recorded for this short URL", json!({ "hash": hash }))
            })?;

        ensure_safe(&short_url)?;

        let total_clicks = self.clicks.count_by_hash(hash).await?;
        let browsers = self.clicks.count_by_browser(hash).await?;
        let platforms = self.clicks.count_by_platform(hash).await?;

        Ok(ClickStats {
            hash: latest.hash,
            created: latest.created,
            properties: latest.properties,
            total_clicks,
            browsers,
            platforms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Redirection, ShortUrl, ShortUrlProperties};
    use crate::domain::repositories::{MockClickRepository, MockShortUrlRepository};

    fn short_url(safe: Option<bool>) -> ShortUrl {
        ShortUrl {
            hash: "abcd1234".to_string(),
            redirection: Redirection::new("https://example.com"),
            created: Utc::now(),
            properties: ShortUrlProperties {
                safe,
                ..Default::default()
            },
        }
    }

    fn click() -> Click {
        Click {
            id: 1,
            hash: "abcd1234".to_string(),
            created: Utc::now(),
            properties: ClickProperties {
                ip: Some("10.0.0.1".to_string()),
                browser: Some("Chrome".to_string()),
                platform: Some("Mac OSX".to_string()),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_log_click_without_user_agent() {
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_save()
            .withf(|c| {
                c.properties.browser.is_none()
                    && c.properties.platform.is_none()
                    && c.properties.referrer.as_deref() == Some("https://ref.example")
            })
            .times(1)
            .returning(|c| {
                Ok(Click {
                    id: 3,
                    hash: c.hash,
                    created: Utc::now(),
                    properties: c.properties,
                })
            });

        let service = ClickService::new(Arc::new(clicks), Arc::new(MockShortUrlRepository::new()));
        let click = service
            .log_click(ClickEvent::new(
                "abcd1234",
                None,
                None,
                Some("https://ref.example"),
            ))
            .await
            .unwrap();

        assert_eq!(click.id, 3);
    }

    #[tokio::test]
    async fn test_user_agent_info_safe() {
        let mut short_urls = MockShortUrlRepository::new();
        let mut clicks = MockClickRepository::new();

        short_urls
            .expect_find_by_hash()
            .returning(|_| Ok(Some(short_url(Some(true)))));
        clicks
            .expect_find_latest_by_hash()
            .returning(|_| Ok(Some(click())));
        clicks.expect_count_by_hash().returning(|_| Ok(5));
        clicks.expect_count_by_browser().returning(|_| {
            Ok(vec![
                ClickCount {
                    name: Some("Chrome".to_string()),
                    clicks: 4,
                },
                ClickCount {
                    name: None,
                    clicks: 1,
                },
            ])
        });
        clicks.expect_count_by_platform().returning(|_| {
            Ok(vec![ClickCount {
                name: Some("Mac OSX".to_string()),
                clicks: 5,
            }])
        });

        let stats = ClickService::new(Arc::new(clicks), Arc::new(short_urls))
            .user_agent_info("abcd1234")
            .await
            .unwrap();

        assert_eq!(stats.hash, "abcd1234");
        assert_eq!(stats.total_clicks, 5);
        assert_eq!(stats.properties.browser.as_deref(), Some("Chrome"));
        assert_eq!(stats.browsers.len(), 2);
        assert_eq!(stats.platforms[0].clicks, 5);
    }

    #[tokio::test]
    async fn test_user_agent_info_unknown_url() {
        let mut short_urls = MockShortUrlRepository::new();
        let mut clicks = MockClickRepository::new();

        short_urls.expect_find_by_hash().returning(|_| Ok(None));
        clicks.expect_find_latest_by_hash().times(0);

        let err = ClickService::new(Arc::new(clicks), Arc::new(short_urls))
            .user_agent_info("nope")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_user_agent_info_without_clicks() {
        let mut short_urls = MockShortUrlRepository::new();
        let mut clicks = MockClickRepository::new();

        short_urls
            .expect_find_by_hash()
            .returning(|_| Ok(Some(short_url(Some(true)))));
        clicks.expect_find_latest_by_hash().returning(|_| Ok(None));

        let err = ClickService::new(Arc::new(clicks), Arc::new(short_urls))
            .user_agent_info("abcd1234")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_user_agent_info_gates_on_safety() {
        for safe in [None, Some(false)] {
            let mut short_urls = MockShortUrlRepository::new();
            let mut clicks = MockClickRepository::new();

            short_urls
                .expect_find_by_hash()
                .returning(move |_| Ok(Some(short_url(safe))));
            clicks
                .expect_find_latest_by_hash()
                .returning(|_| Ok(Some(click())));
            clicks.expect_count_by_hash().times(0);

            let err = ClickService::new(Arc::new(clicks), Arc::new(short_urls))
                .user_agent_info("abcd1234")
                .await
                .unwrap_err();

            if safe.is_none() {
                assert!(matches!(err, AppError::RetryAfter { .. }));
            } else {
                assert!(matches!(err, AppError::Forbidden { .. }));
            }
        }
    }
}
