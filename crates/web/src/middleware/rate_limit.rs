//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: strict limits for login, registration and password
//!   reset requests (~10/min)
//! - `api_rate_limiter`: relaxed limits for the JSON search and near APIs
//!   (~100/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Headers a reverse proxy may use to pass the client IP, in priority order.
const FORWARDED_IP_HEADERS: [&str; 2] = ["x-forwarded-for", "x-real-ip"];

/// Key extractor that trusts proxy headers first, then the peer address.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        // X-Forwarded-For holds a chain; the first entry is the client
        for name in FORWARDED_IP_HEADERS {
            if let Some(ip) = headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
            {
                return Ok(ip);
            }
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Replenishes one request every 6 seconds with a burst of 5.
///
/// # Panics
///
/// Does not panic: `per_second(6)` and `burst_size(5)` are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for the JSON API: ~100 requests per minute per IP.
///
/// Replenishes one request per second with a burst of 50.
///
/// # Panics
///
/// Does not panic: `per_second(1)` and `burst_size(50)` are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}
