//! Rate limiting middleware using token bucket algorithm.
//!
//! Limits apply per client IP to everything under `/api`.
//!
//! - **Rate**: 2 requests per second
//! - **Burst**: 100 requests
//!
//! Requests exceeding the limit receive `429 Too Many Requests`.

use anyhow::anyhow;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
};

const PER_SECOND: u64 = 2;
const BURST_SIZE: u32 = 100;

/// Limiter keyed by the socket peer address.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/link", post(create_link_handler))
///     .layer(rate_limit::layer()?);
/// ```
pub fn layer()
-> anyhow::Result<GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>>
{
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(PER_SECOND)
        .burst_size(BURST_SIZE)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit settings"))?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}

/// Limiter keyed by `X-Forwarded-For` / `X-Real-IP` / `Forwarded`, falling back
/// to the peer address. Use only behind a trusted reverse proxy.
pub fn proxy_layer() -> anyhow::Result<
    GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>,
> {
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(PER_SECOND)
        .burst_size(BURST_SIZE)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit settings"))?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_build() {
        assert!(layer().is_ok());
        assert!(proxy_layer().is_ok());
    }
}
