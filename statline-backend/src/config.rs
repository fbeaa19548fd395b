use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Directory holding the persisted stats tables
    /// Env: DATA_DIR (default: "stats")
    pub data_dir: String,

    /// How often the collector samples the online count and flushes
    /// Env: COLLECTION_INTERVAL_MINUTES (default: 10)
    pub collection_interval: Duration,

    /// Days of online history kept across flushes
    /// Env: DATA_RETENTION_DAYS (default: 14)
    pub data_retention_days: u32,

    /// Whether the summary includes the smoothed tick rate
    /// Env: ENABLE_TPS_TRACKING (default: true)
    pub enable_tps_tracking: bool,

    /// Hard cap on the top-players query limit
    /// Env: MAX_TOP_PLAYERS_LIMIT (default: 100)
    pub max_top_players_limit: usize,

    /// Persist the player tables immediately on every disconnect
    /// Env: SAVE_ON_PLAYER_QUIT (default: true)
    pub save_on_player_quit: bool,

    /// Bearer key the session source must present on ingestion routes
    /// Env: REPORT_KEY (optional; an ephemeral key is generated when unset)
    pub report_key: Option<String>,

    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 1048576 = 1MB)
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,

    /// Rate limit for session endpoints like /join, /quit, /sync (requests per second)
    /// Env: RATE_LIMIT_INGEST_PER_SEC (default: 50)
    /// This is lenient to handle many players joining/leaving at once
    pub rate_limit_ingest_per_sec: u64,

    /// Burst size for session endpoints
    /// Env: RATE_LIMIT_INGEST_BURST (default: 100)
    pub rate_limit_ingest_burst: u32,

    /// Rate limit for query endpoints (requests per second)
    /// Env: RATE_LIMIT_QUERY_PER_SEC (default: 10)
    pub rate_limit_query_per_sec: u64,

    /// Burst size for query endpoints
    /// Env: RATE_LIMIT_QUERY_BURST (default: 20)
    pub rate_limit_query_burst: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        Self {
            port: env_or_default("PORT", 3000),
            data_dir: env_or_default_string("DATA_DIR", "stats"),
            collection_interval: Duration::from_secs(
                60 * env_or_default::<u64>("COLLECTION_INTERVAL_MINUTES", 10),
            ),
            data_retention_days: env_or_default("DATA_RETENTION_DAYS", 14),
            enable_tps_tracking: env_or_default("ENABLE_TPS_TRACKING", true),
            max_top_players_limit: env_or_default("MAX_TOP_PLAYERS_LIMIT", 100),
            save_on_player_quit: env_or_default("SAVE_ON_PLAYER_QUIT", true),
            report_key: var("REPORT_KEY").ok(),
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", 1024 * 1024),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 30)),
            rate_limit_ingest_per_sec: env_or_default("RATE_LIMIT_INGEST_PER_SEC", 50),
            rate_limit_ingest_burst: env_or_default("RATE_LIMIT_INGEST_BURST", 100),
            rate_limit_query_per_sec: env_or_default("RATE_LIMIT_QUERY_PER_SEC", 10),
            rate_limit_query_burst: env_or_default("RATE_LIMIT_QUERY_BURST", 20),
        }
    }

    /// Create configuration with all default values
    pub fn default() -> Self {
        Self {
            port: 3000,
            data_dir: "stats".to_string(),
            collection_interval: Duration::from_secs(600),
            data_retention_days: 14,
            enable_tps_tracking: true,
            max_top_players_limit: 100,
            save_on_player_quit: true,
            report_key: None,
            request_body_limit: 1024 * 1024, // 1 MB
            request_timeout: Duration::from_secs(30),
            rate_limit_ingest_per_sec: 50,
            rate_limit_ingest_burst: 100,
            rate_limit_query_per_sec: 10,
            rate_limit_query_burst: 20,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}
