pub mod collector;
pub mod config;
pub mod directory;
mod error;
pub mod helpers;
mod routes;
pub mod sampler;
pub mod stats;
mod validation;

pub use directory::PlayerDirectory;
pub use sampler::{SharedSampler, TickSampler};
pub use stats::StatsService;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

pub struct AppState {
    pub store: Arc<statline_store::StatsStore>,
    pub directory: Arc<PlayerDirectory>,
    pub stats: StatsService,
    /// SHA-256 hash of the ingestion Bearer key.
    pub report_key_hash: String,
    pub save_on_quit: bool,
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per second for session endpoints (/join, /quit, /sync)
    pub ingest_per_sec: u64,
    /// Burst size for session endpoints
    pub ingest_burst: u32,
    /// Requests per second for query endpoints
    pub query_per_sec: u64,
    /// Burst size for query endpoints
    pub query_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ingest_per_sec: 50,
            ingest_burst: 100,
            query_per_sec: 10,
            query_burst: 20,
        }
    }
}

/// Create the application router with the given state and configuration
pub fn create_app(
    state: Arc<AppState>,
    request_body_limit: usize,
    request_timeout: Duration,
    rate_limit: RateLimitConfig,
) -> Router {
    // Lenient rate limit for session endpoints - many players join/leave at once
    let ingest_governor = GovernorConfigBuilder::default()
        .per_second(rate_limit.ingest_per_sec)
        .burst_size(rate_limit.ingest_burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .unwrap();

    // General rate limit for the reporting surface
    let query_governor = GovernorConfigBuilder::default()
        .per_second(rate_limit.query_per_sec)
        .burst_size(rate_limit.query_burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .unwrap();

    let session_routes = Router::new()
        .route("/session/join", post(routes::join))
        .route("/session/quit", post(routes::quit))
        .route("/session/sync", post(routes::sync))
        .layer(GovernorLayer::new(ingest_governor));

    let query_routes = Router::new()
        .route("/stats/summary", get(routes::summary))
        .route("/stats/online", get(routes::online))
        .route("/stats/hourly", get(routes::hourly))
        .route("/stats/topplayers", get(routes::top_players))
        .layer(GovernorLayer::new(query_governor));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(session_routes)
        .merge(query_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .with_state(state)
}
