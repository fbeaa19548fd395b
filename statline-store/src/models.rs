use arrayvec::ArrayString;
use chrono::{DateTime, Local, Timelike};

/// Player display name - max 16 characters, stored inline (no heap allocation).
pub type PlayerName = ArrayString<16>;

/// A single point of the online-count history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnlineSample {
  /// Unix timestamp in milliseconds when the sample was taken
  pub timestamp: i64,
  /// Number of connected players at that instant
  pub count: u32,
}

/// Convert an epoch-millisecond timestamp to server-local wall-clock time.
/// Returns None for timestamps outside the representable range.
pub fn local_from_millis(millis: i64) -> Option<DateTime<Local>> {
  DateTime::from_timestamp_millis(millis).map(|dt| dt.with_timezone(&Local))
}

/// Hour-of-day bucket label, always minute-zeroed (e.g. "13:00").
/// The hourly table holds at most 24 of these.
pub fn hour_label(dt: &DateTime<Local>) -> String {
  format!("{:02}:00", dt.hour())
}

/// Date label in `YYYY-MM-DD` form.
pub fn date_label(dt: &DateTime<Local>) -> String {
  dt.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn hour_label_is_minute_zeroed() {
    let dt = Local.with_ymd_and_hms(2024, 5, 12, 13, 47, 9).unwrap();
    assert_eq!(hour_label(&dt), "13:00");
    let dt = Local.with_ymd_and_hms(2024, 5, 12, 4, 0, 0).unwrap();
    assert_eq!(hour_label(&dt), "04:00");
  }

  #[test]
  fn date_label_format() {
    let dt = Local.with_ymd_and_hms(2024, 1, 3, 0, 5, 0).unwrap();
    assert_eq!(date_label(&dt), "2024-01-03");
  }

  #[test]
  fn local_from_millis_round_trips() {
    let dt = Local.with_ymd_and_hms(2024, 5, 12, 13, 47, 9).unwrap();
    let back = local_from_millis(dt.timestamp_millis()).unwrap();
    assert_eq!(back, dt);
  }
}
