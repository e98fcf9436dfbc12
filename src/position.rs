//! Position - Totally ordered stream timestamp
//!
//! A position is a logical clock reading of the upstream change feed:
//! whole seconds plus an ordinal that orders events within the same second.
//! Positions observed from a stream are non-decreasing in delivery order.
//!
//! Text form is `<seconds>:<ordinal>`, e.g. `1065:3`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A totally ordered `(seconds, ordinal)` timestamp.
///
/// Ordering is lexicographic: seconds first, then ordinal.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct Position {
    seconds: u64,
    ordinal: u32,
}

impl Position {
    /// Creates a position from its two components.
    #[inline]
    pub const fn new(seconds: u64, ordinal: u32) -> Self {
        Self { seconds, ordinal }
    }

    /// Position at the start of a whole second (ordinal 0).
    #[inline]
    pub const fn at_second(seconds: u64) -> Self {
        Self::new(seconds, 0)
    }

    #[inline]
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    #[inline]
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Whole seconds of event time elapsed since `earlier`.
    ///
    /// Saturates at zero if `earlier` is actually later.
    pub fn seconds_since(&self, earlier: &Position) -> u64 {
        self.seconds.saturating_sub(earlier.seconds)
    }

    /// Wall-clock rendering of the seconds component.
    ///
    /// Returns `None` if the value is outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.seconds).ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }

    /// RFC3339 rendering for logs; falls back to the raw seconds.
    pub fn to_rfc3339(&self) -> String {
        self.to_datetime()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| format!("@{}", self.seconds))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seconds, self.ordinal)
    }
}

/// Failure to parse the `<seconds>:<ordinal>` text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid position '{input}': expected <seconds>:<ordinal>")]
pub struct PositionParseError {
    input: String,
}

impl FromStr for Position {
    type Err = PositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PositionParseError {
            input: s.to_string(),
        };

        let (seconds, ordinal) = s.trim().split_once(':').ok_or_else(err)?;
        let seconds = seconds.parse::<u64>().map_err(|_| err())?;
        let ordinal = ordinal.parse::<u32>().map_err(|_| err())?;

        Ok(Self::new(seconds, ordinal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_seconds_then_ordinal() {
        assert!(Position::new(1000, 9) < Position::new(1001, 0));
        assert!(Position::new(1000, 1) < Position::new(1000, 2));
        assert_eq!(Position::new(5, 5), Position::new(5, 5));
    }

    #[test]
    fn test_seconds_since_saturates() {
        let a = Position::new(1000, 1);
        let b = Position::new(1065, 3);

        assert_eq!(b.seconds_since(&a), 65);
        assert_eq!(a.seconds_since(&b), 0);
    }

    #[test]
    fn test_display_and_parse() {
        let pos = Position::new(1065, 3);
        assert_eq!(pos.to_string(), "1065:3");
        assert_eq!("1065:3".parse::<Position>().unwrap(), pos);
        assert_eq!(" 7:0 ".parse::<Position>().unwrap(), Position::at_second(7));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("1065".parse::<Position>().is_err());
        assert!("a:b".parse::<Position>().is_err());
        assert!("10:-1".parse::<Position>().is_err());
        assert!("".parse::<Position>().is_err());
    }

    #[test]
    fn test_datetime_conversion() {
        let pos = Position::at_second(0);
        assert_eq!(pos.to_rfc3339(), "1970-01-01T00:00:00+00:00");
        assert_eq!(
            Position::at_second(1_700_000_000).to_datetime().unwrap().timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Position::new(12, 3)).unwrap();
        assert_eq!(json, r#"{"seconds":12,"ordinal":3}"#);
    }
}
