//! Short URL creation, redirection and QR retrieval.

use serde_json::json;
use std::sync::Arc;

use crate::domain::entities::{NewShortUrl, Redirection, SafetyStatus, ShortUrl};
use crate::domain::events::{ClickEvent, QrCodeRequest, SafetyCheckRequest};
use crate::domain::ports::PipelineDispatcher;
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::utils::hashing::hash_url;
use crate::utils::link_builder::LinkBuilder;
use crate::utils::url_validator::validate_url;

/// Creation metadata recorded with a new short URL.
#[derive(Debug, Clone, Default)]
pub struct CreateShortUrlData {
    pub ip: Option<String>,
    pub sponsor: Option<String>,
}

/// Client details captured when a redirect is served.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// Service owning the short URL lifecycle.
///
/// Creation stores the row unclassified and hands follow-up work to the
/// background pipeline; reads gate on the row's safety state.
pub struct ShortUrlService {
    repository: Arc<dyn ShortUrlRepository>,
    dispatcher: Arc<dyn PipelineDispatcher>,
    links: LinkBuilder,
}

impl ShortUrlService {
    pub fn new(
        repository: Arc<dyn ShortUrlRepository>,
        dispatcher: Arc<dyn PipelineDispatcher>,
        links: LinkBuilder,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            links,
        }
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Creates (or returns) the short URL for `url`.
    ///
    /// # Deduplication
    ///
    /// The key is derived from the URL, so submitting the same URL again returns
    /// the stored row. If that row is still unclassified the safety check is
    /// dispatched again, and a QR request is dispatched when one is asked for
    /// and no image exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL is not an absolute HTTP(S) URL.
    /// Returns [`AppError::Conflict`] if the key is taken by a different URL.
    /// Returns [`AppError::ServiceUnavailable`] if the pipeline is shut down.
    pub async fn create(
        &self,
        url: &str,
        qr_request: bool,
        data: CreateShortUrlData,
    ) -> Result<ShortUrl, AppError> {
        validate_url(url).map_err(|e| {
            AppError::bad_request(
                "Invalid URL",
                json!({ "url": url, "reason": e.to_string() }),
            )
        })?;

        let hash = hash_url(url).map_err(|e| {
            AppError::internal("Failed to hash URL", json!({ "reason": e.to_string() }))
        })?;

        if let Some(existing) = self.repository.find_by_hash(&hash).await? {
            return self.reuse_existing(existing, url, qr_request).await;
        }

        let new_short_url = NewShortUrl {
            hash: hash.clone(),
            redirection: Redirection::new(url),
            ip: data.ip,
            sponsor: data.sponsor,
        };

        let short_url = match self.repository.save(new_short_url).await {
            Ok(saved) => saved,
            // Lost a race against an identical concurrent request.
            Err(AppError::Conflict { .. }) => match self.repository.find_by_hash(&hash).await? {
                Some(existing) => return self.reuse_existing(existing, url, qr_request).await,
                None => {
                    return Err(AppError::internal(
                        "Short URL vanished after conflict",
                        json!({ "hash": hash }),
                    ));
                }
            },
            Err(e) => return Err(e),
        };

        tracing::info!(hash = %short_url.hash, qr = qr_request, "Short URL created");

        self.dispatch_follow_ups(&short_url, qr_request).await?;

        Ok(short_url)
    }

    async fn reuse_existing(
        &self,
        existing: ShortUrl,
        url: &str,
        qr_request: bool,
    ) -> Result<ShortUrl, AppError> {
        if existing.redirection.target != url {
            tracing::warn!(hash = %existing.hash, "Hash collision between distinct targets");
            return Err(AppError::conflict(
                "Short key already used by a different URL",
                json!({ "hash": existing.hash }),
            ));
        }

        self.dispatch_follow_ups(&existing, qr_request).await?;

        Ok(existing)
    }

    async fn dispatch_follow_ups(
        &self,
        short_url: &ShortUrl,
        qr_request: bool,
    ) -> Result<(), AppError> {
        if short_url.safety() == SafetyStatus::Pending {
            self.dispatcher
                .request_safety_check(SafetyCheckRequest {
                    hash: short_url.hash.clone(),
                    target: short_url.redirection.target.clone(),
                })
                .await?;
        }

        if qr_request && !short_url.has_qr() {
            self.dispatcher
                .request_qr_code(QrCodeRequest {
                    hash: short_url.hash.clone(),
                    link: self.links.link(&short_url.hash),
                })
                .await?;
        }

        Ok(())
    }

    /// Resolves a short URL for redirection and records the click.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the key is unknown
    /// - [`AppError::RetryAfter`] while the target is still being classified
    /// - [`AppError::Forbidden`] if the target was classified as unsafe
    pub async fn redirect_to(&self, hash: &str, client: ClientInfo) -> Result<Redirection, AppError> {
        let short_url = self.find(hash).await?;
        ensure_safe(&short_url)?;

        let event = ClickEvent {
            hash: short_url.hash.clone(),
            ip: client.ip,
            user_agent: client.user_agent,
            referrer: client.referrer,
        };
        if let Err(e) = self.dispatcher.record_click(event) {
            tracing::warn!(hash = %short_url.hash, error = %e, "Click not recorded");
        }

        Ok(short_url.redirection)
    }

    /// Returns the stored QR image (PNG) of a short URL.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the key is unknown
    /// - [`AppError::RetryAfter`] while classification or rendering is pending
    /// - [`AppError::Forbidden`] if the target was classified as unsafe
    pub async fn qr_code(&self, hash: &str) -> Result<Vec<u8>, AppError> {
        let short_url = self.find(hash).await?;
        ensure_safe(&short_url)?;

        short_url.properties.qr.ok_or_else(|| {
            AppError::retry_after(
                "QR code is not available yet",
                json!({ "hash": hash }),
            )
        })
    }

    /// Returns a short URL regardless of its safety state.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the key is unknown.
    pub async fn summary(&self, hash: &str) -> Result<ShortUrl, AppError> {
        self.find(hash).await
    }

    /// Dispatches a safety check for up to `limit` unclassified rows.
    ///
    /// Used at startup and by the periodic sweep so rows left pending by a
    /// previous run or a dropped batch get classified.
    pub async fn requeue_pending(&self, limit: i64) -> Result<usize, AppError> {
        let pending = self.repository.find_pending(limit).await?;
        let count = pending.len();

        for short_url in pending {
            self.dispatcher
                .request_safety_check(SafetyCheckRequest {
                    hash: short_url.hash,
                    target: short_url.redirection.target,
                })
                .await?;
        }

        Ok(count)
    }

    async fn find(&self, hash: &str) -> Result<ShortUrl, AppError> {
        self.repository
            .find_by_hash(hash)
            .await?
            .ok_or_else(|| AppError::not_found("Short URL not found", json!({ "hash": hash })))
    }
}

/// Maps the safety state of a short URL to the read gate.
pub(crate) fn ensure_safe(short_url: &ShortUrl) -> Result<(), AppError> {
    match short_url.safety() {
        SafetyStatus::Safe => Ok(()),
        SafetyStatus::Pending => Err(AppError::retry_after(
            "Target URL has not been validated yet",
            json!({ "hash": short_url.hash }),
        )),
        SafetyStatus::Unsafe => Err(AppError::forbidden(
            "Target URL is unsafe",
            json!({ "hash": short_url.hash }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ShortUrlProperties;
    use crate::domain::ports::{DispatchError, MockPipelineDispatcher};
    use crate::domain::repositories::MockShortUrlRepository;
    use chrono::Utc;

    const URL: &str = "https://example.com/some/page";

    fn stored(target: &str, safe: Option<bool>, qr: Option<Vec<u8>>) -> ShortUrl {
        ShortUrl {
            hash: hash_url(target).unwrap(),
            redirection: Redirection::new(target),
            created: Utc::now(),
            properties: ShortUrlProperties {
                ip: Some("127.0.0.1".to_string()),
                safe,
                qr,
                ..Default::default()
            },
        }
    }

    fn service(repo: MockShortUrlRepository, dispatcher: MockPipelineDispatcher) -> ShortUrlService {
        ShortUrlService::new(
            Arc::new(repo),
            Arc::new(dispatcher),
            LinkBuilder::new("http://localhost:3000"),
        )
    }

    #[tokio::test]
    async fn test_create_new_dispatches_safety_and_qr() {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();
        let hash = hash_url(URL).unwrap();

        repo.expect_find_by_hash().times(1).returning(|_| Ok(None));
        repo.expect_save()
            .withf(|n| {
                n.redirection.target == URL
                    && n.redirection.mode == 307
                    && n.ip.as_deref() == Some("10.0.0.1")
                    && n.sponsor.as_deref() == Some("acme")
            })
            .times(1)
            .returning(|n| {
                Ok(ShortUrl {
                    hash: n.hash,
                    redirection: n.redirection,
                    created: Utc::now(),
                    properties: ShortUrlProperties {
                        ip: n.ip,
                        sponsor: n.sponsor,
                        ..Default::default()
                    },
                })
            });

        let expected_hash = hash.clone();
        dispatcher
            .expect_request_safety_check()
            .withf(move |r| r.hash == expected_hash && r.target == URL)
            .times(1)
            .returning(|_| Ok(()));
        let expected_link = format!("http://localhost:3000/{hash}");
        dispatcher
            .expect_request_qr_code()
            .withf(move |r| r.link == expected_link)
            .times(1)
            .returning(|_| Ok(()));

        let created = service(repo, dispatcher)
            .create(
                URL,
                true,
                CreateShortUrlData {
                    ip: Some("10.0.0.1".to_string()),
                    sponsor: Some("acme".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(created.hash, hash);
        assert_eq!(created.safety(), SafetyStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_without_qr_request() {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();

        repo.expect_find_by_hash().returning(|_| Ok(None));
        repo.expect_save()
            .returning(|n| Ok(stored(&n.redirection.target, None, None)));
        dispatcher
            .expect_request_safety_check()
            .times(1)
            .returning(|_| Ok(()));
        dispatcher.expect_request_qr_code().times(0);

        let result = service(repo, dispatcher)
            .create(URL, false, CreateShortUrlData::default())
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_url() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_hash().times(0);
        repo.expect_save().times(0);

        let result = service(repo, MockPipelineDispatcher::new())
            .create("ftp://example.com", false, CreateShortUrlData::default())
            .await;

        assert!(matches!(result.unwrap_err(), AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_create_existing_classified_is_not_rechecked() {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();

        repo.expect_find_by_hash()
            .returning(|_| Ok(Some(stored(URL, Some(true), Some(vec![1])))));
        repo.expect_save().times(0);
        dispatcher.expect_request_safety_check().times(0);
        dispatcher.expect_request_qr_code().times(0);

        let existing = service(repo, dispatcher)
            .create(URL, true, CreateShortUrlData::default())
            .await
            .unwrap();

        assert_eq!(existing.safety(), SafetyStatus::Safe);
    }

    #[tokio::test]
    async fn test_create_existing_pending_is_requeued() {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();

        repo.expect_find_by_hash()
            .returning(|_| Ok(Some(stored(URL, None, None))));
        repo.expect_save().times(0);
        dispatcher
            .expect_request_safety_check()
            .times(1)
            .returning(|_| Ok(()));
        dispatcher
            .expect_request_qr_code()
            .times(1)
            .returning(|_| Ok(()));

        let result = service(repo, dispatcher)
            .create(URL, true, CreateShortUrlData::default())
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_hash_collision_is_conflict() {
        let mut repo = MockShortUrlRepository::new();

        repo.expect_find_by_hash().returning(|_| {
            let mut other = stored("https://other.example.com", Some(true), None);
            other.hash = hash_url(URL).unwrap();
            Ok(Some(other))
        });

        let result = service(repo, MockPipelineDispatcher::new())
            .create(URL, false, CreateShortUrlData::default())
            .await;

        assert!(matches!(result.unwrap_err(), AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_concurrent_insert_returns_winner() {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();
        let mut seq = mockall::Sequence::new();

        repo.expect_find_by_hash()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        repo.expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::conflict("dup", serde_json::json!({}))));
        repo.expect_find_by_hash()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(stored(URL, Some(true), None))));
        dispatcher.expect_request_safety_check().times(0);

        let result = service(repo, dispatcher)
            .create(URL, false, CreateShortUrlData::default())
            .await;

        assert_eq!(result.unwrap().safety(), SafetyStatus::Safe);
    }

    #[tokio::test]
    async fn test_create_fails_when_pipeline_closed() {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();

        repo.expect_find_by_hash().returning(|_| Ok(None));
        repo.expect_save()
            .returning(|n| Ok(stored(&n.redirection.target, None, None)));
        dispatcher
            .expect_request_safety_check()
            .returning(|_| Err(DispatchError::Closed("safe_browsing")));

        let result = service(repo, dispatcher)
            .create(URL, false, CreateShortUrlData::default())
            .await;

        assert!(matches!(
            result.unwrap_err(),
            AppError::ServiceUnavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_redirect_safe_records_click() {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();

        repo.expect_find_by_hash()
            .returning(|_| Ok(Some(stored(URL, Some(true), None))));
        dispatcher
            .expect_record_click()
            .withf(|e| {
                e.ip.as_deref() == Some("1.2.3.4") && e.user_agent.as_deref() == Some("curl/8.0")
            })
            .times(1)
            .returning(|_| Ok(()));

        let redirection = service(repo, dispatcher)
            .redirect_to(
                "whatever",
                ClientInfo {
                    ip: Some("1.2.3.4".to_string()),
                    user_agent: Some("curl/8.0".to_string()),
                    referrer: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(redirection.target, URL);
        assert_eq!(redirection.mode, 307);
    }

    #[tokio::test]
    async fn test_redirect_survives_full_click_queue() {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();

        repo.expect_find_by_hash()
            .returning(|_| Ok(Some(stored(URL, Some(true), None))));
        dispatcher
            .expect_record_click()
            .returning(|_| Err(DispatchError::Full("clicks")));

        let result = service(repo, dispatcher)
            .redirect_to("whatever", ClientInfo::default())
            .await;

        assert!(result.is_ok());
    }

    async fn redirect_with_state(safe: Option<bool>) -> Result<Redirection, AppError> {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();

        repo.expect_find_by_hash()
            .returning(move |_| Ok(Some(stored(URL, safe, None))));
        dispatcher.expect_record_click().times(0);

        service(repo, dispatcher)
            .redirect_to("whatever", ClientInfo::default())
            .await
    }

    #[tokio::test]
    async fn test_redirect_pending_is_retry_after() {
        let err = redirect_with_state(None).await.unwrap_err();
        assert!(matches!(err, AppError::RetryAfter { .. }));
    }

    #[tokio::test]
    async fn test_redirect_unsafe_is_forbidden() {
        let err = redirect_with_state(Some(false)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_redirect_unknown_is_not_found() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_hash().returning(|_| Ok(None));

        let err = service(repo, MockPipelineDispatcher::new())
            .redirect_to("nope", ClientInfo::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_qr_code_states() {
        let cases: Vec<(Option<bool>, Option<Vec<u8>>, &str)> = vec![
            (Some(true), Some(vec![9, 9]), "ok"),
            (Some(true), None, "retry"),
            (None, Some(vec![9, 9]), "retry"),
            (Some(false), Some(vec![9, 9]), "forbidden"),
        ];

        for (safe, qr, expected) in cases {
            let mut repo = MockShortUrlRepository::new();
            repo.expect_find_by_hash()
                .returning(move |_| Ok(Some(stored(URL, safe, qr.clone()))));

            let result = service(repo, MockPipelineDispatcher::new())
                .qr_code("whatever")
                .await;

            match expected {
                "ok" => assert_eq!(result.unwrap(), vec![9, 9]),
                "retry" => assert!(matches!(result.unwrap_err(), AppError::RetryAfter { .. })),
                _ => assert!(matches!(result.unwrap_err(), AppError::Forbidden { .. })),
            }
        }
    }

    #[tokio::test]
    async fn test_summary_ignores_safety() {
        let mut repo = MockShortUrlRepository::new();
        repo.expect_find_by_hash()
            .returning(|_| Ok(Some(stored(URL, Some(false), None))));

        let summary = service(repo, MockPipelineDispatcher::new())
            .summary("whatever")
            .await
            .unwrap();

        assert_eq!(summary.safety(), SafetyStatus::Unsafe);
    }

    #[tokio::test]
    async fn test_requeue_pending() {
        let mut repo = MockShortUrlRepository::new();
        let mut dispatcher = MockPipelineDispatcher::new();

        repo.expect_find_pending()
            .withf(|limit| *limit == 100)
            .returning(|_| {
                Ok(vec![
                    stored("https://a.com", None, None),
                    stored("https://b.com", None, None),
                ])
            });
        dispatcher
            .expect_request_safety_check()
            .times(2)
            .returning(|_| Ok(()));

        let count = service(repo, dispatcher).requeue_pending(100).await.unwrap();

        assert_eq!(count, 2);
    }
}
