/// Input validation for ingestion payloads and query parameters
use thiserror::Error;

pub const HISTORY_DAYS_DEFAULT: i64 = 7;
pub const HISTORY_DAYS_MAX: i64 = 14;
pub const TOP_PLAYERS_DEFAULT: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Player name cannot be empty")]
    PlayerNameEmpty,

    #[error("Player name too long (max 16 characters, got {0})")]
    PlayerNameTooLong(usize),

    #[error("Player name contains invalid characters (only alphanumeric and underscore allowed)")]
    PlayerNameInvalidChars,

    #[error("Invalid days parameter: {0:?}")]
    InvalidDays(String),

    #[error("Invalid limit parameter: {0:?}")]
    InvalidLimit(String),

    #[error("Player list too large (max {max} players, got {actual})")]
    PlayerListTooLarge { max: usize, actual: usize },
}

/// Validates a player name
///
/// Rules:
/// - Cannot be empty
/// - Max 16 characters
/// - Only alphanumeric characters and underscores
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::PlayerNameEmpty);
    }

    if name.len() > 16 {
        return Err(ValidationError::PlayerNameTooLong(name.len()));
    }

    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::PlayerNameInvalidChars);
    }

    Ok(())
}

/// Caps sync payloads at 1000 players per request (prevents DOS)
pub fn validate_player_count(actual: usize) -> Result<(), ValidationError> {
    const MAX_PLAYERS: usize = 1000;

    if actual > MAX_PLAYERS {
        return Err(ValidationError::PlayerListTooLarge {
            max: MAX_PLAYERS,
            actual,
        });
    }

    Ok(())
}

/// Parses the `days` query parameter. Missing means the default;
/// a non-numeric value is a validation failure. Out-of-range values are
/// clamped to the window by the aggregation side, not rejected here.
pub fn parse_days(param: Option<&str>) -> Result<i64, ValidationError> {
    let Some(raw) = param else {
        return Ok(HISTORY_DAYS_DEFAULT);
    };
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidDays(raw.to_owned()))
}

/// Parses the `limit` query parameter. Missing means the default; values
/// below 1 are raised to 1. The configured cap is applied downstream.
pub fn parse_limit(param: Option<&str>) -> Result<usize, ValidationError> {
    let Some(raw) = param else {
        return Ok(TOP_PLAYERS_DEFAULT);
    };
    let limit = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidLimit(raw.to_owned()))?;
    Ok(limit.max(1) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_player_names() {
        assert!(validate_player_name("Steve").is_ok());
        assert!(validate_player_name("Player_123").is_ok());
        assert!(validate_player_name("a").is_ok());
        assert!(validate_player_name("1234567890123456").is_ok()); // exactly 16 chars
    }

    #[test]
    fn test_empty_player_name() {
        assert_eq!(
            validate_player_name(""),
            Err(ValidationError::PlayerNameEmpty)
        );
    }

    #[test]
    fn test_player_name_too_long() {
        let long_name = "12345678901234567"; // 17 characters
        assert_eq!(
            validate_player_name(long_name),
            Err(ValidationError::PlayerNameTooLong(17))
        );
    }

    #[test]
    fn test_player_name_invalid_chars() {
        assert_eq!(
            validate_player_name("Player-123"),
            Err(ValidationError::PlayerNameInvalidChars)
        );
        assert_eq!(
            validate_player_name("Player 123"),
            Err(ValidationError::PlayerNameInvalidChars)
        );
    }

    #[test]
    fn test_player_count_cap() {
        assert!(validate_player_count(1000).is_ok());
        assert_eq!(
            validate_player_count(1001),
            Err(ValidationError::PlayerListTooLarge {
                max: 1000,
                actual: 1001
            })
        );
    }

    #[test]
    fn test_parse_days_default_and_numeric() {
        assert_eq!(parse_days(None), Ok(HISTORY_DAYS_DEFAULT));
        assert_eq!(parse_days(Some("3")), Ok(3));
        assert_eq!(parse_days(Some("20")), Ok(20)); // clamped downstream
    }

    #[test]
    fn test_parse_days_rejects_non_numeric() {
        assert_eq!(
            parse_days(Some("abc")),
            Err(ValidationError::InvalidDays("abc".to_owned()))
        );
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None), Ok(TOP_PLAYERS_DEFAULT));
        assert_eq!(parse_limit(Some("25")), Ok(25));
        assert_eq!(parse_limit(Some("0")), Ok(1));
        assert_eq!(parse_limit(Some("-5")), Ok(1));
        assert_eq!(
            parse_limit(Some("ten")),
            Err(ValidationError::InvalidLimit("ten".to_owned()))
        );
    }
}
