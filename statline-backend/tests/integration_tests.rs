use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use statline_backend::{
    AppState, PlayerDirectory, RateLimitConfig, StatsService, TickSampler, create_app, helpers,
};
use statline_store::StatsStore;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
// for `oneshot` method

const TEST_KEY: &str = "statline-sk-integration-test-key";

/// Helper to create an app backed by a temp data directory
async fn setup_app(save_on_quit: bool) -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Arc::new(StatsStore::open(dir.path()).await);
    let directory = Arc::new(PlayerDirectory::new());
    let sampler = Arc::new(tokio::sync::RwLock::new(TickSampler::new()));
    let stats = StatsService::new(store.clone(), directory.clone(), sampler, 100, true);

    let state = Arc::new(AppState {
        store,
        directory,
        stats,
        report_key_hash: helpers::hash_report_key(TEST_KEY),
        save_on_quit,
    });
    let app = create_app(
        state,
        1024 * 1024,
        Duration::from_secs(30),
        RateLimitConfig::default(),
    );
    (app, dir)
}

/// Helper to send a request and get response
async fn send_request(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut request_builder = Request::builder()
        .uri(uri)
        .method(method)
        // SmartIpKeyExtractor needs a peer address for rate limiting
        .header("x-forwarded-for", "127.0.0.1");

    // Add Authorization header if provided
    if let Some(token) = auth_token {
        request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
    }

    // Build request with body
    let request = if let Some(json_body) = body {
        request_builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json_body).unwrap()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    // Send request
    let response = app.oneshot(request).await.unwrap();

    // Extract status
    let status = response.status();

    // Extract body
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    // Try to parse as JSON, or return empty object
    let json = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

fn player_id(n: u128) -> String {
    Uuid::from_u128(n).to_string()
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    // GIVEN: A running application
    let (app, _dir) = setup_app(false).await;

    // WHEN: Making a GET request to /health
    let (status, _body) = send_request(app, "GET", "/health", None, None).await;

    // THEN: Should return 200 OK
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// SESSION ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_join_records_session_and_summary_reflects_it() {
    // GIVEN: A running application
    let (app, _dir) = setup_app(false).await;

    // WHEN: A player joins
    let (status, _body) = send_request(
        app.clone(),
        "POST",
        "/session/join",
        Some(json!({ "id": player_id(1), "name": "Steve", "level": 5, "health": 20.0 })),
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // THEN: The summary shows one known, one online player
    let (status, body) = send_request(app, "GET", "/stats/summary", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["totalPlayers"], 1);
    assert_eq!(body["summary"]["onlinePlayers"], 1);
    assert_eq!(body["summary"]["newPlayers"], 1);
    // Cold-start sampler reports the nominal rate
    assert_eq!(body["summary"]["tps"], "20.00");
}

#[tokio::test]
async fn test_join_with_invalid_key_is_unauthorized() {
    // GIVEN: A running application
    let (app, _dir) = setup_app(false).await;

    // WHEN: Joining with a wrong Bearer key
    let (status, body) = send_request(
        app,
        "POST",
        "/session/join",
        Some(json!({ "id": player_id(1), "name": "Steve" })),
        Some("statline-sk-wrong-key"),
    )
    .await;

    // THEN: Should return 401 with a JSON error body
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("error").is_some(), "Response should have 'error' field");
}

#[tokio::test]
async fn test_join_rejects_invalid_player_name() {
    // GIVEN: A running application
    let (app, _dir) = setup_app(false).await;

    // WHEN: Joining with a name containing invalid characters
    let (status, body) = send_request(
        app,
        "POST",
        "/session/join",
        Some(json!({ "id": player_id(1), "name": "not a name!" })),
        Some(TEST_KEY),
    )
    .await;

    // THEN: Should return 400 with a JSON error body
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn test_quit_folds_session_into_playtime() {
    // GIVEN: A connected player
    let (app, _dir) = setup_app(false).await;
    send_request(
        app.clone(),
        "POST",
        "/session/join",
        Some(json!({ "id": player_id(1), "name": "Steve" })),
        Some(TEST_KEY),
    )
    .await;

    // WHEN: The player quits with a final level
    let (status, _body) = send_request(
        app.clone(),
        "POST",
        "/session/quit",
        Some(json!({ "id": player_id(1), "level": 42 })),
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // THEN: Top players lists them as offline, with no live fields
    let (status, body) = send_request(app, "GET", "/stats/topplayers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let players = body["players"].as_array().unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0]["name"], "Steve");
    assert_eq!(players[0]["online"], false);
    assert!(players[0].get("level").is_none());
    assert!(players[0].get("health").is_none());
}

#[tokio::test]
async fn test_quit_persists_player_tables_when_enabled() {
    // GIVEN: An application with save-on-quit enabled
    let (app, dir) = setup_app(true).await;
    send_request(
        app.clone(),
        "POST",
        "/session/join",
        Some(json!({ "id": player_id(1), "name": "Steve" })),
        Some(TEST_KEY),
    )
    .await;

    // WHEN: The player quits
    send_request(
        app,
        "POST",
        "/session/quit",
        Some(json!({ "id": player_id(1), "level": 3 })),
        Some(TEST_KEY),
    )
    .await;

    // THEN: The player tables were written immediately
    assert!(dir.path().join("player_playtimes.csv").exists());
    assert!(dir.path().join("player_levels.csv").exists());
}

#[tokio::test]
async fn test_sync_reconciles_active_sessions() {
    // GIVEN: Player A is connected
    let (app, _dir) = setup_app(false).await;
    send_request(
        app.clone(),
        "POST",
        "/session/join",
        Some(json!({ "id": player_id(1), "name": "Alice" })),
        Some(TEST_KEY),
    )
    .await;

    // WHEN: A sync reports only player B
    let (status, _body) = send_request(
        app.clone(),
        "POST",
        "/session/sync",
        Some(json!({ "players": [{ "id": player_id(2), "name": "Bob" }] })),
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // THEN: Only B is online, but both players are known
    let (_status, body) = send_request(app.clone(), "GET", "/stats/summary", None, None).await;
    assert_eq!(body["summary"]["onlinePlayers"], 1);
    assert_eq!(body["summary"]["totalPlayers"], 2);

    let (_status, body) = send_request(app, "GET", "/stats/topplayers", None, None).await;
    let players = body["players"].as_array().unwrap();
    assert_eq!(players.len(), 2);
    let bob = players.iter().find(|p| p["name"] == "Bob").unwrap();
    assert_eq!(bob["online"], true);
    let alice = players.iter().find(|p| p["name"] == "Alice").unwrap();
    assert_eq!(alice["online"], false);
}

#[tokio::test]
async fn test_rejoin_keeps_single_session() {
    // GIVEN: A player who joins twice without quitting
    let (app, _dir) = setup_app(false).await;
    for _ in 0..2 {
        let (status, _body) = send_request(
            app.clone(),
            "POST",
            "/session/join",
            Some(json!({ "id": player_id(1), "name": "Steve" })),
            Some(TEST_KEY),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // THEN: They count as one online player
    let (_status, body) = send_request(app, "GET", "/stats/summary", None, None).await;
    assert_eq!(body["summary"]["onlinePlayers"], 1);
}
