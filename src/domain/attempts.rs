//! Persisted attempt history for one rate-limit key.
//!
//! The log is a plain list of millisecond Unix timestamps. It is stored as a
//! JSON array so records written by a browser store (`[1700000000000, ...]`)
//! and by this crate are interchangeable.

use std::time::Duration;

/// Prefix of every rate-limit storage key.
pub const STORAGE_KEY_PREFIX: &str = "ratelimit_";

/// Storage key holding the attempts of `key`.
pub fn storage_key(key: &str) -> String {
    format!("{}{}", STORAGE_KEY_PREFIX, key)
}

/// Attempt timestamps for one key, oldest first as recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptLog {
    attempts: Vec<u64>,
}

impl AttemptLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from raw timestamps.
    pub fn from_timestamps(attempts: Vec<u64>) -> Self {
        Self { attempts }
    }

    /// Decode a stored record.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self::from_timestamps)
    }

    /// Encode for storage.
    pub fn to_json(&self) -> String {
        // A Vec<u64> always serializes.
        serde_json::to_string(&self.attempts).unwrap_or_else(|_| "[]".to_string())
    }

    /// Drop every attempt that is `window` or more older than `now_ms`.
    ///
    /// Timestamps ahead of `now_ms` (clock skew) are kept.
    pub fn expire(&mut self, now_ms: u64, window: Duration) {
        let window_ms = window_millis(window);
        self.attempts
            .retain(|&at| now_ms.saturating_sub(at) < window_ms);
    }

    /// Append an attempt.
    pub fn record(&mut self, now_ms: u64) {
        self.attempts.push(now_ms);
    }

    /// Earliest timestamp in the log.
    pub fn oldest(&self) -> Option<u64> {
        self.attempts.iter().copied().min()
    }

    /// Whole minutes until the oldest attempt leaves the window, rounded up.
    pub fn minutes_until_slot(&self, now_ms: u64, window: Duration) -> u64 {
        let Some(oldest) = self.oldest() else {
            return 0;
        };
        let elapsed = now_ms.saturating_sub(oldest);
        let remaining_ms = window_millis(window).saturating_sub(elapsed);
        remaining_ms.div_ceil(60_000)
    }

    /// Number of attempts.
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Raw timestamps.
    pub fn timestamps(&self) -> &[u64] {
        &self.attempts
    }
}

fn window_millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: u64 = 60_000;

    #[test]
    fn test_storage_key() {
        assert_eq!(storage_key("contact-form"), "ratelimit_contact-form");
    }

    #[test]
    fn test_json_shape() {
        let log = AttemptLog::from_timestamps(vec![1_700_000_000_000, 1_700_000_060_000]);
        assert_eq!(log.to_json(), "[1700000000000,1700000060000]");
        assert_eq!(AttemptLog::from_json(&log.to_json()).unwrap(), log);
    }

    #[test]
    fn test_corrupt_json_is_an_error() {
        assert!(AttemptLog::from_json("not json").is_err());
        assert!(AttemptLog::from_json(r#"{"a":1}"#).is_err());
        assert!(AttemptLog::from_json("[-1]").is_err());
    }

    #[test]
    fn test_expire_keeps_attempts_inside_window() {
        let now = 100 * MINUTE;
        let mut log = AttemptLog::from_timestamps(vec![
            now - 20 * MINUTE,
            now - 15 * MINUTE,
            now - 15 * MINUTE + 1,
            now - MINUTE,
        ]);

        log.expire(now, Duration::from_secs(15 * 60));

        assert_eq!(log.timestamps(), &[now - 15 * MINUTE + 1, now - MINUTE]);
    }

    #[test]
    fn test_expire_keeps_future_timestamps() {
        let now = 10 * MINUTE;
        let mut log = AttemptLog::from_timestamps(vec![now + MINUTE]);
        log.expire(now, Duration::from_secs(60));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_minutes_until_slot_rounds_up() {
        let now = 100 * MINUTE;
        let window = Duration::from_secs(15 * 60);

        let log = AttemptLog::from_timestamps(vec![now - 5 * MINUTE, now]);
        assert_eq!(log.minutes_until_slot(now, window), 10);

        let log = AttemptLog::from_timestamps(vec![now - 5 * MINUTE - 1]);
        assert_eq!(log.minutes_until_slot(now, window), 10);

        let log = AttemptLog::from_timestamps(vec![now - 5 * MINUTE + 1]);
        assert_eq!(log.minutes_until_slot(now, window), 11);

        let log = AttemptLog::from_timestamps(vec![now - 4 * MINUTE - 30_000]);
        assert_eq!(log.minutes_until_slot(now, window), 11);

        assert_eq!(AttemptLog::new().minutes_until_slot(now, window), 0);
    }

    #[test]
    fn test_minutes_until_slot_with_future_oldest() {
        let now = 100 * MINUTE;
        let log = AttemptLog::from_timestamps(vec![now + 3 * MINUTE]);
        assert_eq!(log.minutes_until_slot(now, Duration::from_secs(15 * 60)), 15);
    }
}
