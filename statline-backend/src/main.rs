use statline_backend::{
    AppState, PlayerDirectory, RateLimitConfig, SharedSampler, StatsService, TickSampler,
    collector, helpers, sampler,
};
use statline_store::StatsStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, watch};

#[tokio::main]
async fn main() {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting statline backend...");

    let config = statline_backend::config::Config::from_env();
    tracing::info!(
        "Configuration: port={}, data_dir={}, interval={}min, retention={}d, body_limit={}KB, timeout={}s",
        config.port,
        config.data_dir,
        config.collection_interval.as_secs() / 60,
        config.data_retention_days,
        config.request_body_limit / 1024,
        config.request_timeout.as_secs(),
    );

    let store = Arc::new(StatsStore::open(&config.data_dir).await);
    let directory = Arc::new(PlayerDirectory::new());
    let tick_sampler: SharedSampler = Arc::new(RwLock::new(TickSampler::new()));

    let report_key = config.report_key.clone().unwrap_or_else(|| {
        let key = helpers::generate_report_key();
        tracing::warn!(%key, "REPORT_KEY not set, generated an ephemeral ingestion key");
        key
    });

    let stats = StatsService::new(
        store.clone(),
        directory.clone(),
        tick_sampler.clone(),
        config.max_top_players_limit,
        config.enable_tps_tracking,
    );
    let state = Arc::new(AppState {
        store: store.clone(),
        directory,
        stats,
        report_key_hash: helpers::hash_report_key(&report_key),
        save_on_quit: config.save_on_player_quit,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tick_task = config
        .enable_tps_tracking
        .then(|| sampler::spawn_tick_task(tick_sampler, shutdown_rx.clone()));
    let collector_task = collector::spawn(
        store.clone(),
        config.collection_interval,
        config.data_retention_days,
        shutdown_rx,
    );

    let rate_limit = RateLimitConfig {
        ingest_per_sec: config.rate_limit_ingest_per_sec,
        ingest_burst: config.rate_limit_ingest_burst,
        query_per_sec: config.rate_limit_query_per_sec,
        query_burst: config.rate_limit_query_burst,
    };
    let app = statline_backend::create_app(
        state,
        config.request_body_limit,
        config.request_timeout,
        rate_limit,
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await.unwrap();
    tracing::info!("Server listening on {}", addr);

    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
    });
    if let Err(e) = serve.await {
        tracing::error!("Axum server error: {}", e);
    }

    // Stop the background tasks; an in-flight collection completes first.
    let _ = shutdown_tx.send(true);
    if let Some(task) = tick_task {
        let _ = task.await;
    }
    let _ = collector_task.await;

    store
        .flush(config.data_retention_days, helpers::now_millis())
        .await;
    tracing::info!("Final flush complete, statline backend stopped");
}
