//! In-memory directory of players reported by the session source.
//!
//! Resolves a player id to a display name, last-reported level/health and
//! first-seen timestamp. Not persisted; it re-fills as the session source
//! reports, the same way the stats engine's original host resolved players
//! through the server's own registry.

use scc::HashMap;
use statline_store::PlayerName;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PlayerProfile {
    pub name: PlayerName,
    pub level: Option<i32>,
    pub health: Option<f64>,
    /// When this id was first reported, epoch-ms.
    pub first_seen: i64,
}

pub struct PlayerDirectory {
    players: HashMap<Uuid, PlayerProfile>,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Upsert a profile from an ingestion report. The first-seen timestamp
    /// is kept from the first observation; level and health only move
    /// forward when the report carries them.
    pub async fn record(
        &self,
        id: Uuid,
        name: PlayerName,
        level: Option<i32>,
        health: Option<f64>,
        now_ms: i64,
    ) {
        let updated = self
            .players
            .update_async(&id, |_, profile| {
                profile.name = name;
                if level.is_some() {
                    profile.level = level;
                }
                if health.is_some() {
                    profile.health = health;
                }
            })
            .await;
        if updated.is_none() {
            let _ = self
                .players
                .insert_async(
                    id,
                    PlayerProfile {
                        name,
                        level,
                        health,
                        first_seen: now_ms,
                    },
                )
                .await;
        }
    }

    /// Update only the level of an already-known player.
    pub async fn record_level(&self, id: Uuid, level: i32) {
        let _ = self
            .players
            .update_async(&id, |_, profile| profile.level = Some(level))
            .await;
    }

    pub async fn resolve(&self, id: Uuid) -> Option<PlayerProfile> {
        self.players
            .read_async(&id, |_, profile| profile.clone())
            .await
    }

    /// Number of players first reported at or after the cutoff.
    pub async fn first_seen_since(&self, cutoff_ms: i64) -> usize {
        let mut count = 0;
        self.players
            .iter_async(|_, profile| {
                if profile.first_seen >= cutoff_ms {
                    count += 1;
                }
                true
            })
            .await;
        count
    }
}

impl Default for PlayerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PlayerName {
        PlayerName::try_from(s).unwrap()
    }

    #[tokio::test]
    async fn record_keeps_first_seen_across_updates() {
        let directory = PlayerDirectory::new();
        let id = Uuid::from_u128(1);

        directory.record(id, name("Steve"), Some(5), None, 1000).await;
        directory
            .record(id, name("Steve"), Some(7), Some(19.5), 9000)
            .await;

        let profile = directory.resolve(id).await.unwrap();
        assert_eq!(profile.first_seen, 1000);
        assert_eq!(profile.level, Some(7));
        assert_eq!(profile.health, Some(19.5));
    }

    #[tokio::test]
    async fn update_without_level_preserves_previous_level() {
        let directory = PlayerDirectory::new();
        let id = Uuid::from_u128(2);

        directory.record(id, name("Alex"), Some(12), None, 1000).await;
        directory.record(id, name("Alex"), None, None, 2000).await;

        assert_eq!(directory.resolve(id).await.unwrap().level, Some(12));
    }

    #[tokio::test]
    async fn first_seen_since_counts_new_players() {
        let directory = PlayerDirectory::new();
        directory
            .record(Uuid::from_u128(3), name("Old"), None, None, 1000)
            .await;
        directory
            .record(Uuid::from_u128(4), name("New"), None, None, 5000)
            .await;

        assert_eq!(directory.first_seen_since(2000).await, 1);
        assert_eq!(directory.first_seen_since(0).await, 2);
    }
}
