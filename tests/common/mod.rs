#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use chrono::Utc;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tower::Layer;

use safelink::application::services::{BulkService, ClickService, ShortUrlService};
use safelink::domain::entities::{
    Click, ClickCount, NewClick, NewShortUrl, Redirection, ShortUrl, ShortUrlProperties,
};
use safelink::domain::events::{ClickEvent, QrCodeRequest, SafetyCheckRequest};
use safelink::domain::repositories::{ClickRepository, ShortUrlRepository};
use safelink::error::AppError;
use safelink::pipeline::PipelineHandle;
use safelink::state::AppState;
use safelink::utils::hashing::hash_url;
use safelink::utils::link_builder::LinkBuilder;

pub const BASE_URL: &str = "http://localhost:3000";

/// Short URL repository backed by a map.
#[derive(Default)]
pub struct InMemoryShortUrlRepository {
    rows: Mutex<HashMap<String, ShortUrl>>,
}

impl InMemoryShortUrlRepository {
    /// Stores `target` under its real hash and returns the hash.
    pub fn insert(&self, target: &str, safe: Option<bool>, qr: Option<Vec<u8>>) -> String {
        let hash = hash_url(target).unwrap();
        let row = ShortUrl {
            hash: hash.clone(),
            redirection: Redirection::new(target),
            created: Utc::now(),
            properties: ShortUrlProperties {
                safe,
                qr,
                ..Default::default()
            },
        };
        self.rows.lock().unwrap().insert(hash.clone(), row);
        hash
    }

    pub fn get(&self, hash: &str) -> Option<ShortUrl> {
        self.rows.lock().unwrap().get(hash).cloned()
    }
}

#[async_trait]
impl ShortUrlRepository for InMemoryShortUrlRepository {
    async fn find_by_hash(&self, hash: &str) -> Result<Option<ShortUrl>, AppError> {
        Ok(self.get(hash))
    }

    async fn save(&self, new_short_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&new_short_url.hash) {
            return Err(AppError::conflict("duplicate", serde_json::json!({})));
        }

        let row = ShortUrl {
            hash: new_short_url.hash.clone(),
            redirection: new_short_url.redirection,
            created: Utc::now(),
            properties: ShortUrlProperties {
                ip: new_short_url.ip,
                sponsor: new_short_url.sponsor,
                ..Default::default()
            },
        };
        rows.insert(new_short_url.hash, row.clone());
        Ok(row)
    }

    async fn update_safe_status_by_target(
        &self,
        target: &str,
        safe: bool,
    ) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for row in rows.values_mut() {
            if row.redirection.target == target {
                row.properties.safe = Some(safe);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn update_qr_code_by_hash(&self, hash: &str, qr: Vec<u8>) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(hash) {
            Some(row) => {
                row.properties.qr = Some(qr);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_pending(&self, limit: i64) -> Result<Vec<ShortUrl>, AppError> {
        let rows = self.rows.lock().unwrap();
        let mut pending: Vec<ShortUrl> = rows
            .values()
            .filter(|r| r.properties.safe.is_none())
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Click repository backed by a vector.
#[derive(Default)]
pub struct InMemoryClickRepository {
    clicks: Mutex<Vec<Click>>,
}

impl InMemoryClickRepository {
    pub fn all(&self) -> Vec<Click> {
        self.clicks.lock().unwrap().clone()
    }

    fn count_by<F>(&self, hash: &str, key: F) -> Vec<ClickCount>
    where
        F: Fn(&Click) -> Option<String>,
    {
        let clicks = self.clicks.lock().unwrap();
        let mut counts: Vec<ClickCount> = Vec::new();
        for click in clicks.iter().filter(|c| c.hash == hash) {
            let name = key(click);
            match counts.iter_mut().find(|c| c.name == name) {
                Some(count) => count.clicks += 1,
                None => counts.push(ClickCount { name, clicks: 1 }),
            }
        }
        counts.sort_by(|a, b| b.clicks.cmp(&a.clicks));
        counts
    }
}

#[async_trait]
impl ClickRepository for InMemoryClickRepository {
    async fn save(&self, new_click: NewClick) -> Result<Click, AppError> {
        let mut clicks = self.clicks.lock().unwrap();
        let click = Click {
            id: clicks.len() as i64 + 1,
            hash: new_click.hash,
            created: Utc::now(),
            properties: new_click.properties,
        };
        clicks.push(click.clone());
        Ok(click)
    }

    async fn find_latest_by_hash(&self, hash: &str) -> Result<Option<Click>, AppError> {
        let clicks = self.clicks.lock().unwrap();
        Ok(clicks.iter().rev().find(|c| c.hash == hash).cloned())
    }

    async fn count_by_browser(&self, hash: &str) -> Result<Vec<ClickCount>, AppError> {
        Ok(self.count_by(hash, |c| c.properties.browser.clone()))
    }

    async fn count_by_platform(&self, hash: &str) -> Result<Vec<ClickCount>, AppError> {
        Ok(self.count_by(hash, |c| c.properties.platform.clone()))
    }

    async fn count_by_hash(&self, hash: &str) -> Result<i64, AppError> {
        let clicks = self.clicks.lock().unwrap();
        Ok(clicks.iter().filter(|c| c.hash == hash).count() as i64)
    }
}

/// Receiving ends of the request queues, for asserting what handlers dispatched.
pub struct TestQueues {
    pub safety: mpsc::Receiver<SafetyCheckRequest>,
    pub qr: mpsc::Receiver<QrCodeRequest>,
    pub clicks: mpsc::Receiver<ClickEvent>,
}

pub struct TestContext {
    pub state: AppState,
    pub queues: TestQueues,
    pub short_urls: Arc<InMemoryShortUrlRepository>,
    pub clicks: Arc<InMemoryClickRepository>,
}

/// Application state over in-memory repositories, with no pipeline workers.
pub fn create_test_state() -> TestContext {
    let (safety_tx, safety) = mpsc::channel(100);
    let (qr_tx, qr) = mpsc::channel(100);
    let (click_tx, clicks_rx) = mpsc::channel(100);

    let short_urls = Arc::new(InMemoryShortUrlRepository::default());
    let clicks = Arc::new(InMemoryClickRepository::default());
    let dispatcher = Arc::new(PipelineHandle::new(safety_tx, qr_tx, click_tx));

    let short_url_service = Arc::new(ShortUrlService::new(
        short_urls.clone(),
        dispatcher.clone(),
        LinkBuilder::new(BASE_URL),
    ));
    let click_service = Arc::new(ClickService::new(clicks.clone(), short_urls.clone()));
    let bulk_service = Arc::new(BulkService::new(short_url_service.clone(), 5));

    let state = AppState {
        short_url_service,
        click_service,
        bulk_service,
        dispatcher,
        short_urls: short_urls.clone(),
        behind_proxy: false,
        fast_bulk_concurrency: 5,
    };

    TestContext {
        state,
        queues: TestQueues {
            safety,
            qr,
            clicks: clicks_rx,
        },
        short_urls,
        clicks,
    }
}

/// Inserts a fixed peer address, as `into_make_service_with_connect_info` would.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
