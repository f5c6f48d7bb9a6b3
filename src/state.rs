//! Shared application state injected into all handlers.

use std::sync::Arc;

use crate::application::services::{BulkService, ClickService, ShortUrlService};
use crate::domain::ports::PipelineDispatcher;
use crate::domain::repositories::ShortUrlRepository;

#[derive(Clone)]
pub struct AppState {
    pub short_url_service: Arc<ShortUrlService>,
    pub click_service: Arc<ClickService>,
    pub bulk_service: Arc<BulkService>,
    /// Pipeline entry point, also probed by the health check.
    pub dispatcher: Arc<dyn PipelineDispatcher>,
    /// Used by the health check to probe the database.
    pub short_urls: Arc<dyn ShortUrlRepository>,
    /// Read client IPs from proxy headers.
    pub behind_proxy: bool,
    /// Lines processed in parallel per fast-bulk connection.
    pub fast_bulk_concurrency: usize,
}
