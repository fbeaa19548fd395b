mod error;
mod models;

pub use error::{Result, StoreError};
pub use models::{OnlineSample, PlayerName, date_label, hour_label, local_from_millis};

use chrono::{NaiveDate, Timelike};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

const ONLINE_HISTORY_FILE: &str = "online_history.csv";
const HOURLY_DISTRIBUTION_FILE: &str = "hourly_distribution.csv";
const PLAYER_PLAYTIMES_FILE: &str = "player_playtimes.csv";
const PLAYER_LEVELS_FILE: &str = "player_levels.csv";

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Single source of truth for all mutable statistics state.
///
/// Every table is a concurrent map, safe for get/put from multiple tasks
/// without external locking. Individual map operations are atomic and
/// linearizable per key; there is no cross-map transaction. Persistence is
/// whole-file rewrite (temp file + rename) of plain CSV, one table per file.
pub struct StatsStore {
  data_dir: PathBuf,
  /// Epoch-ms sample time -> online player count.
  online_history: scc::HashMap<i64, u32>,
  /// Hour label ("HH:00") -> date label ("YYYY-MM-DD") -> online count.
  hourly_distribution: scc::HashMap<String, HashMap<String, u32>>,
  /// Cumulative completed playtime in milliseconds. Never includes the
  /// player's current open session.
  playtimes: scc::HashMap<Uuid, u64>,
  /// Session-start epoch-ms for currently connected players.
  sessions: scc::HashMap<Uuid, i64>,
  /// Last-observed level, recorded at disconnect.
  levels: scc::HashMap<Uuid, i32>,
}

impl StatsStore {
  /// Create an empty store rooted at the given data directory.
  /// No disk access happens until `load` or `flush`.
  pub fn new(data_dir: impl AsRef<Path>) -> Self {
    Self {
      data_dir: data_dir.as_ref().to_path_buf(),
      online_history: scc::HashMap::new(),
      hourly_distribution: scc::HashMap::new(),
      playtimes: scc::HashMap::new(),
      sessions: scc::HashMap::new(),
      levels: scc::HashMap::new(),
    }
  }

  /// Create the data directory if needed and hydrate from any existing
  /// files. Missing files mean an empty table, not an error; a failed
  /// directory creation is logged and the store starts empty.
  pub async fn open(data_dir: impl AsRef<Path>) -> Self {
    let store = Self::new(data_dir);
    if let Err(e) = tokio::fs::create_dir_all(&store.data_dir).await {
      tracing::error!(error = %e, dir = %store.data_dir.display(), "failed to create stats directory");
    }
    store.load().await;
    store
  }

  // ========================================================================
  // Session lifecycle
  // ========================================================================

  /// Record a session start. A second call before the matching end simply
  /// replaces the start time (last join wins).
  pub async fn record_session_start(&self, player: Uuid, now_ms: i64) {
    if self
      .sessions
      .update_async(&player, |_, start| *start = now_ms)
      .await
      .is_none()
    {
      let _ = self.sessions.insert_async(player, now_ms).await;
    }
  }

  /// Fold the player's open session into their cumulative playtime and
  /// remove the active-session entry. With no recorded start the duration
  /// is 0, which still creates the playtime record. Records the supplied
  /// level, if any. Returns the completed session's duration in ms.
  pub async fn record_session_end(&self, player: Uuid, level: Option<i32>, now_ms: i64) -> u64 {
    let duration = match self.sessions.remove_async(&player).await {
      Some((_, start)) => (now_ms - start).max(0) as u64,
      None => 0,
    };

    if self
      .playtimes
      .update_async(&player, |_, total| *total += duration)
      .await
      .is_none()
    {
      let _ = self.playtimes.insert_async(player, duration).await;
    }

    if let Some(level) = level {
      if self
        .levels
        .update_async(&player, |_, l| *l = level)
        .await
        .is_none()
      {
        let _ = self.levels.insert_async(player, level).await;
      }
    }

    duration
  }

  // ========================================================================
  // Sampling
  // ========================================================================

  /// Append an online-count snapshot at `now_ms` and, unless the wall-clock
  /// minute is exactly :00, write the count into the hourly bucket for the
  /// current (hour, date) pair, overwriting any prior value for that pair.
  pub async fn sample_online_count(&self, count: u32, now_ms: i64) {
    let _ = self.online_history.insert_async(now_ms, count).await;

    let Some(local) = local_from_millis(now_ms) else {
      return;
    };
    if local.minute() == 0 {
      return;
    }

    let hour = hour_label(&local);
    let date = date_label(&local);
    let updated = self
      .hourly_distribution
      .update_async(&hour, |_, dates| {
        dates.insert(date.clone(), count);
      })
      .await;
    if updated.is_none() {
      let _ = self
        .hourly_distribution
        .insert_async(hour, HashMap::from([(date, count)]))
        .await;
    }
  }

  // ========================================================================
  // Read primitives
  // ========================================================================

  /// Number of currently connected players.
  pub fn online_count(&self) -> usize {
    self.sessions.len()
  }

  pub async fn is_connected(&self, player: Uuid) -> bool {
    self.sessions.contains_async(&player).await
  }

  /// Ids of all currently connected players.
  pub async fn active_players(&self) -> Vec<Uuid> {
    let mut ids = Vec::new();
    self
      .sessions
      .iter_async(|id, _| {
        ids.push(*id);
        true
      })
      .await;
    ids
  }

  /// Cumulative playtime plus the elapsed time of any open session.
  /// None if the player has never been seen.
  pub async fn effective_playtime(&self, player: Uuid, now_ms: i64) -> Option<u64> {
    let stored = self.playtimes.read_async(&player, |_, total| *total).await;
    let open = self
      .sessions
      .read_async(&player, |_, start| (now_ms - *start).max(0) as u64)
      .await;
    match (stored, open) {
      (None, None) => None,
      (stored, open) => Some(stored.unwrap_or(0) + open.unwrap_or(0)),
    }
  }

  /// Effective playtime for every known player (stored + open session).
  pub async fn effective_playtimes(&self, now_ms: i64) -> Vec<(Uuid, u64)> {
    let mut combined: HashMap<Uuid, u64> = HashMap::new();
    self
      .playtimes
      .iter_async(|id, total| {
        combined.insert(*id, *total);
        true
      })
      .await;
    self
      .sessions
      .iter_async(|id, start| {
        let open = (now_ms - *start).max(0) as u64;
        *combined.entry(*id).or_insert(0) += open;
        true
      })
      .await;
    combined.into_iter().collect()
  }

  /// Distinct player ids ever seen (completed or open sessions).
  pub async fn known_player_count(&self) -> usize {
    let mut ids: HashSet<Uuid> = HashSet::new();
    self
      .playtimes
      .iter_async(|id, _| {
        ids.insert(*id);
        true
      })
      .await;
    self
      .sessions
      .iter_async(|id, _| {
        ids.insert(*id);
        true
      })
      .await;
    ids.len()
  }

  /// Online-count snapshots at or after the cutoff, unordered.
  pub async fn history_since(&self, cutoff_ms: i64) -> Vec<OnlineSample> {
    let mut samples = Vec::new();
    self
      .online_history
      .iter_async(|ts, count| {
        if *ts >= cutoff_ms {
          samples.push(OnlineSample {
            timestamp: *ts,
            count: *count,
          });
        }
        true
      })
      .await;
    samples
  }

  /// Recorded (hour label, count) pairs for the given date label.
  pub async fn hourly_counts_for(&self, date: &str) -> Vec<(String, u32)> {
    let mut counts = Vec::new();
    self
      .hourly_distribution
      .iter_async(|hour, dates| {
        if let Some(count) = dates.get(date) {
          counts.push((hour.clone(), *count));
        }
        true
      })
      .await;
    counts
  }

  pub async fn level(&self, player: Uuid) -> Option<i32> {
    self.levels.read_async(&player, |_, level| *level).await
  }

  // ========================================================================
  // Persistence
  // ========================================================================

  /// Hydrate all tables from disk. Malformed lines are skipped individually
  /// with a warning; the rest of each file still loads.
  pub async fn load(&self) {
    self.load_online_history().await;
    self.load_hourly_distribution().await;
    self.load_player_playtimes().await;
    self.load_player_levels().await;
  }

  /// Prune the history and hourly tables to the retention window, then
  /// rewrite all four files. Each table is persisted independently; a
  /// write failure is logged and does not abort the others.
  pub async fn flush(&self, retention_days: u32, now_ms: i64) {
    self.prune(retention_days, now_ms).await;
    self.save_online_history().await;
    self.save_hourly_distribution().await;
    self.save_player_tables().await;
  }

  /// Rewrite only the playtime and level files (the save-on-quit path).
  pub async fn save_player_tables(&self) {
    self.save_player_playtimes().await;
    self.save_player_levels().await;
  }

  async fn prune(&self, retention_days: u32, now_ms: i64) {
    let cutoff = now_ms - retention_days as i64 * MS_PER_DAY;
    self
      .online_history
      .retain_async(|ts, _| *ts >= cutoff)
      .await;

    let Some(cutoff_date) = local_from_millis(cutoff).map(|dt| dt.date_naive()) else {
      return;
    };
    self
      .hourly_distribution
      .retain_async(|_, dates| {
        dates.retain(|date, _| {
          NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(|d| d >= cutoff_date)
            .unwrap_or(false)
        });
        !dates.is_empty()
      })
      .await;
  }

  async fn load_online_history(&self) {
    let Some(lines) = self.read_table(ONLINE_HISTORY_FILE).await else {
      return;
    };
    for line in &lines {
      let parts: Vec<&str> = line.split(',').collect();
      if parts.len() != 2 {
        warn!(%line, "skipping malformed online history record");
        continue;
      }
      match (parts[0].parse::<i64>(), parts[1].parse::<u32>()) {
        (Ok(timestamp), Ok(count)) => {
          let _ = self.online_history.insert_async(timestamp, count).await;
        }
        _ => warn!(%line, "skipping malformed online history record"),
      }
    }
    info!(records = self.online_history.len(), "loaded online history");
  }

  async fn load_hourly_distribution(&self) {
    let Some(lines) = self.read_table(HOURLY_DISTRIBUTION_FILE).await else {
      return;
    };
    for line in &lines {
      let parts: Vec<&str> = line.split(',').collect();
      let valid = parts.len() == 3 && is_hour_label(parts[0]) && parts[2].parse::<u32>().is_ok();
      if !valid {
        warn!(%line, "skipping malformed hourly distribution record");
        continue;
      }
      let (hour, date) = (parts[0].to_owned(), parts[1].to_owned());
      let count = parts[2].parse::<u32>().unwrap_or(0);
      let updated = self
        .hourly_distribution
        .update_async(&hour, |_, dates| {
          dates.insert(date.clone(), count);
        })
        .await;
      if updated.is_none() {
        let _ = self
          .hourly_distribution
          .insert_async(hour, HashMap::from([(date, count)]))
          .await;
      }
    }
    info!("loaded hourly distribution");
  }

  async fn load_player_playtimes(&self) {
    let Some(lines) = self.read_table(PLAYER_PLAYTIMES_FILE).await else {
      return;
    };
    for line in &lines {
      let parts: Vec<&str> = line.split(',').collect();
      if parts.len() != 2 {
        warn!(%line, "skipping malformed playtime record");
        continue;
      }
      match (Uuid::parse_str(parts[0]), parts[1].parse::<u64>()) {
        (Ok(player), Ok(playtime)) => {
          let _ = self.playtimes.insert_async(player, playtime).await;
        }
        _ => warn!(%line, "skipping malformed playtime record"),
      }
    }
    info!(records = self.playtimes.len(), "loaded player playtimes");
  }

  async fn load_player_levels(&self) {
    let Some(lines) = self.read_table(PLAYER_LEVELS_FILE).await else {
      return;
    };
    for line in &lines {
      let parts: Vec<&str> = line.split(',').collect();
      if parts.len() != 2 {
        warn!(%line, "skipping malformed level record");
        continue;
      }
      match (Uuid::parse_str(parts[0]), parts[1].parse::<i32>()) {
        (Ok(player), Ok(level)) => {
          let _ = self.levels.insert_async(player, level).await;
        }
        _ => warn!(%line, "skipping malformed level record"),
      }
    }
    info!(records = self.levels.len(), "loaded player levels");
  }

  async fn save_online_history(&self) {
    let mut lines = Vec::new();
    self
      .online_history
      .iter_async(|ts, count| {
        lines.push(format!("{ts},{count}"));
        true
      })
      .await;
    self.write_table(ONLINE_HISTORY_FILE, lines).await;
  }

  async fn save_hourly_distribution(&self) {
    let mut lines = Vec::new();
    self
      .hourly_distribution
      .iter_async(|hour, dates| {
        for (date, count) in dates {
          lines.push(format!("{hour},{date},{count}"));
        }
        true
      })
      .await;
    self.write_table(HOURLY_DISTRIBUTION_FILE, lines).await;
  }

  async fn save_player_playtimes(&self) {
    let mut lines = Vec::new();
    self
      .playtimes
      .iter_async(|player, playtime| {
        lines.push(format!("{player},{playtime}"));
        true
      })
      .await;
    self.write_table(PLAYER_PLAYTIMES_FILE, lines).await;
  }

  async fn save_player_levels(&self) {
    let mut lines = Vec::new();
    self
      .levels
      .iter_async(|player, level| {
        lines.push(format!("{player},{level}"));
        true
      })
      .await;
    self.write_table(PLAYER_LEVELS_FILE, lines).await;
  }

  /// Read a table file into lines. None when the file does not exist or
  /// cannot be read (the latter is logged).
  async fn read_table(&self, name: &str) -> Option<Vec<String>> {
    let path = self.data_dir.join(name);
    match tokio::fs::read_to_string(&path).await {
      Ok(contents) => Some(contents.lines().map(str::to_owned).collect()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
      Err(source) => {
        let e = StoreError::Read { path, source };
        tracing::error!(error = %e, "failed to load table");
        None
      }
    }
  }

  async fn write_table(&self, name: &str, lines: Vec<String>) {
    if let Err(e) = self.try_write_table(name, &lines).await {
      tracing::error!(error = %e, "failed to persist table");
    }
  }

  /// Whole-file rewrite through a temp file and rename, so a crash
  /// mid-write never leaves a half-written table.
  async fn try_write_table(&self, name: &str, lines: &[String]) -> Result<()> {
    let path = self.data_dir.join(name);
    let tmp = self.data_dir.join(format!("{name}.tmp"));

    let mut contents = lines.join("\n");
    if !contents.is_empty() {
      contents.push('\n');
    }

    tokio::fs::write(&tmp, contents)
      .await
      .map_err(|source| StoreError::Write {
        path: tmp.clone(),
        source,
      })?;
    tokio::fs::rename(&tmp, &path)
      .await
      .map_err(|source| StoreError::Write { path, source })?;
    Ok(())
  }
}

/// Accept only minute-zeroed hour labels ("00:00" through "23:00").
fn is_hour_label(label: &str) -> bool {
  let Some((hour, minute)) = label.split_once(':') else {
    return false;
  };
  minute == "00" && hour.len() == 2 && hour.parse::<u32>().map(|h| h < 24).unwrap_or(false)
}
