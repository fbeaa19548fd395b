use crate::AppState;
use crate::error::AppError;
use crate::helpers;
use crate::stats::{HistoryPoint, Summary, TopPlayer};
use crate::validation;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::TypedHeader;
use axum_macros::debug_handler;
use headers::Authorization;
use headers::authorization::Bearer;
use serde::{Deserialize, Serialize};
use statline_store::PlayerName;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
pub(crate) struct SessionReport {
    id: Uuid,
    name: String,
    level: Option<i32>,
    health: Option<f64>,
}

#[derive(Deserialize)]
pub(crate) struct QuitRequest {
    id: Uuid,
    level: Option<i32>,
}

#[derive(Deserialize)]
pub(crate) struct SyncRequest {
    players: Vec<SessionReport>,
}

#[derive(Deserialize)]
pub(crate) struct HistoryParams {
    days: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct TopPlayersParams {
    limit: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct SummaryResponse {
    summary: Summary,
}

#[derive(Serialize)]
pub(crate) struct OnlineHistoryResponse {
    players: Vec<HistoryPoint>,
    hourly_distribution: BTreeMap<String, u32>,
}

#[derive(Serialize)]
pub(crate) struct HourlyDistributionResponse {
    hourly_distribution: BTreeMap<String, u32>,
}

#[derive(Serialize)]
pub(crate) struct TopPlayersResponse {
    players: Vec<TopPlayer>,
}

fn authorize(state: &AppState, auth: &Authorization<Bearer>) -> Result<(), AppError> {
    if helpers::hash_report_key(auth.token()) != state.report_key_hash {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn parse_name(name: &str) -> Result<PlayerName, AppError> {
    validation::validate_player_name(name)?;
    PlayerName::try_from(name)
        .map_err(|_| AppError::ValidationError("Player name too long".to_string()))
}

#[debug_handler]
pub(crate) async fn join(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<SessionReport>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    let name = parse_name(&payload.name)?;

    let now = helpers::now_millis();
    state
        .directory
        .record(payload.id, name, payload.level, payload.health, now)
        .await;
    state.store.record_session_start(payload.id, now).await;

    Ok(StatusCode::OK)
}

pub(crate) async fn quit(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<QuitRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;

    let now = helpers::now_millis();
    state
        .store
        .record_session_end(payload.id, payload.level, now)
        .await;
    if let Some(level) = payload.level {
        state.directory.record_level(payload.id, level).await;
    }

    if state.save_on_quit {
        state.store.save_player_tables().await;
    }

    Ok(StatusCode::OK)
}

/// Reconcile against a full player list from the session source: start
/// sessions for reported-but-inactive players, end sessions for
/// active-but-unreported ones.
pub(crate) async fn sync(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<SyncRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_player_count(payload.players.len())?;

    let now = helpers::now_millis();
    let mut reported = HashSet::with_capacity(payload.players.len());
    for player in &payload.players {
        let name = parse_name(&player.name)?;
        reported.insert(player.id);
        state
            .directory
            .record(player.id, name, player.level, player.health, now)
            .await;
        if !state.store.is_connected(player.id).await {
            state.store.record_session_start(player.id, now).await;
        }
    }

    for id in state.store.active_players().await {
        if !reported.contains(&id) {
            let level = state.directory.resolve(id).await.and_then(|p| p.level);
            state.store.record_session_end(id, level, now).await;
        }
    }

    Ok(StatusCode::OK)
}

pub(crate) async fn summary(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.stats.summary(helpers::now_millis()).await;
    Ok(Json(SummaryResponse { summary }))
}

#[debug_handler]
pub(crate) async fn online(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let days = validation::parse_days(params.days.as_deref())?;

    let now = helpers::now_millis();
    let players = state.stats.history(days, now).await;
    let hourly_distribution = state.stats.hourly_distribution(now).await;

    Ok(Json(OnlineHistoryResponse {
        players,
        hourly_distribution,
    }))
}

pub(crate) async fn hourly(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let hourly_distribution = state.stats.hourly_distribution(helpers::now_millis()).await;
    Ok(Json(HourlyDistributionResponse {
        hourly_distribution,
    }))
}

pub(crate) async fn top_players(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopPlayersParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = validation::parse_limit(params.limit.as_deref())?;

    let players = state
        .stats
        .top_players(limit, helpers::now_millis())
        .await;
    Ok(Json(TopPlayersResponse { players }))
}
