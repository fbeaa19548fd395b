//! Read-side aggregation over the stats store. Never mutates state.

use crate::directory::PlayerDirectory;
use crate::sampler::SharedSampler;
use crate::validation::HISTORY_DAYS_MAX;
use chrono::{DateTime, Local, Timelike};
use serde::Serialize;
use statline_store::{StatsStore, date_label, hour_label, local_from_millis};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_players: usize,
    pub online_players: usize,
    pub new_players: usize,
    /// Average effective playtime across all known players, milliseconds.
    pub avg_playtime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tps: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryPoint {
    pub timestamp: i64,
    pub online: u32,
    /// Hour of day (0-23) in server local time.
    pub hour: u32,
    /// Day of the week, e.g. "MONDAY".
    pub day: String,
}

#[derive(Debug, Serialize)]
pub struct TopPlayer {
    pub name: String,
    pub uuid: Uuid,
    /// Effective playtime in milliseconds (stored plus open session).
    pub playtime: u64,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<f64>,
}

/// Stateless query functions over the store, the directory and the sampler.
#[derive(Clone)]
pub struct StatsService {
    store: Arc<StatsStore>,
    directory: Arc<PlayerDirectory>,
    sampler: SharedSampler,
    max_top_players: usize,
    enable_tps: bool,
}

impl StatsService {
    pub fn new(
        store: Arc<StatsStore>,
        directory: Arc<PlayerDirectory>,
        sampler: SharedSampler,
        max_top_players: usize,
        enable_tps: bool,
    ) -> Self {
        Self {
            store,
            directory,
            sampler,
            max_top_players,
            enable_tps,
        }
    }

    pub async fn summary(&self, now_ms: i64) -> Summary {
        let total_players = self.store.known_player_count().await;
        let online_players = self.store.online_count();
        let new_players = self.directory.first_seen_since(now_ms - MS_PER_DAY).await;

        let total_playtime: u64 = self
            .store
            .effective_playtimes(now_ms)
            .await
            .iter()
            .map(|(_, playtime)| *playtime)
            .sum();
        let avg_playtime = if total_players > 0 {
            total_playtime / total_players as u64
        } else {
            0
        };

        let tps = if self.enable_tps {
            Some(self.sampler.read().await.tps_string())
        } else {
            None
        };

        Summary {
            total_players,
            online_players,
            new_players,
            avg_playtime,
            tps,
        }
    }

    /// Online-count history for the last `days` days (clamped to [1, 14]),
    /// sorted ascending by timestamp.
    pub async fn history(&self, days: i64, now_ms: i64) -> Vec<HistoryPoint> {
        let days = days.clamp(1, HISTORY_DAYS_MAX);
        let cutoff = now_ms - days * MS_PER_DAY;

        let mut points: Vec<HistoryPoint> = self
            .store
            .history_since(cutoff)
            .await
            .into_iter()
            .filter_map(|sample| {
                let local = local_from_millis(sample.timestamp)?;
                Some(HistoryPoint {
                    timestamp: sample.timestamp,
                    online: sample.count,
                    hour: local.hour(),
                    day: day_of_week(&local),
                })
            })
            .collect();
        points.sort_by_key(|point| point.timestamp);
        points
    }

    /// All 24 hour labels, today's recorded counts overlaid, and the entry
    /// for the current hour replaced with the live connected count so it is
    /// fresh even between scheduled samples.
    pub async fn hourly_distribution(&self, now_ms: i64) -> BTreeMap<String, u32> {
        let mut result: BTreeMap<String, u32> =
            (0..24).map(|hour| (format!("{hour:02}:00"), 0)).collect();

        let Some(local) = local_from_millis(now_ms) else {
            return result;
        };
        for (hour, count) in self.store.hourly_counts_for(&date_label(&local)).await {
            if let Some(slot) = result.get_mut(&hour) {
                *slot = count;
            }
        }
        result.insert(hour_label(&local), self.store.online_count() as u32);
        result
    }

    /// Players ranked by effective playtime, capped at the configured
    /// maximum. A player the directory cannot name is skipped without
    /// counting against the limit. Level and health are only reported for
    /// connected players.
    pub async fn top_players(&self, limit: usize, now_ms: i64) -> Vec<TopPlayer> {
        let limit = limit.min(self.max_top_players);

        let mut combined = self.store.effective_playtimes(now_ms).await;
        combined.sort_by(|a, b| b.1.cmp(&a.1));

        let mut players = Vec::new();
        for (id, playtime) in combined {
            if players.len() >= limit {
                break;
            }
            let Some(profile) = self.directory.resolve(id).await else {
                continue;
            };
            let online = self.store.is_connected(id).await;
            players.push(TopPlayer {
                name: profile.name.to_string(),
                uuid: id,
                playtime,
                online,
                level: if online { profile.level } else { None },
                health: if online { profile.health } else { None },
            });
        }
        players
    }
}

fn day_of_week(dt: &DateTime<Local>) -> String {
    dt.format("%A").to_string().to_uppercase()
}
