//! Utility functions for identifier generation and timestamp handling.
//!
//! The emitter takes its ids and clock as injected dependencies so tests can
//! pin both; the defaults here are a random UUID v4 and the system clock.

mod ids;
pub mod timestamps;

pub use ids::{generate_uuid, IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use timestamps::{
    format_rfc3339, from_unix_millis, Clock, FixedClock, SystemClock, Timestamp,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_valid() {
        let id = generate_uuid();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_format_rfc3339_uses_z() {
        let ts = SystemClock.now();
        let formatted = format_rfc3339(&ts);
        assert!(formatted.contains('T'));
        assert!(formatted.ends_with('Z'));
    }
}
