//! Timestamp helpers and the injectable clock.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> Timestamp;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Converts host epoch milliseconds into a timestamp.
///
/// Returns `None` for values chrono cannot represent, and for zero, which
/// hosts use to mean "not started yet".
#[must_use]
pub fn from_unix_millis(millis: i64) -> Option<Timestamp> {
    if millis == 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}

/// Formats a timestamp as RFC 3339 with millisecond precision and a `Z`
/// suffix, the form used in `ce-time` headers.
#[must_use]
pub fn format_rfc3339(dt: &Timestamp) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_unix_millis() {
        let ts = from_unix_millis(1_700_000_000_123).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_zero_millis_is_absent() {
        assert!(from_unix_millis(0).is_none());
    }

    #[test]
    fn test_out_of_range_millis_is_absent() {
        assert!(from_unix_millis(i64::MAX).is_none());
    }

    #[test]
    fn test_fixed_clock() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), at);
        assert_eq!(format_rfc3339(&clock.now()), "2024-01-02T03:04:05.000Z");
    }
}
