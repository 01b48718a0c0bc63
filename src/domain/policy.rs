//! Rate limiting policy for form submissions.
//!
//! A policy allows up to `limit` attempts per key within a sliding window.
//! Attempts outside the window are expired lazily whenever a key is checked.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Default number of attempts per window.
pub const DEFAULT_LIMIT: u32 = 3;
/// Default window length in minutes.
pub const DEFAULT_WINDOW_MINUTES: u64 = 15;

/// Error returned when a policy or field rule is misconfigured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Attempt limit must be greater than zero
    ZeroLimit,
    /// Window duration must be greater than zero
    ZeroWindow,
    /// Minimum length exceeds maximum length
    InvalidLengthBounds {
        /// Field the bounds belong to
        field: &'static str,
        /// Configured minimum
        min: usize,
        /// Configured maximum
        max: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroLimit => write!(f, "attempt limit must be greater than 0"),
            ConfigError::ZeroWindow => write!(f, "time window must be greater than 0"),
            ConfigError::InvalidLengthBounds { field, min, max } => write!(
                f,
                "length bounds for '{}' are inverted: min {} > max {}",
                field, min, max
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Sliding-window attempt limit.
///
/// # Example
/// ```
/// use form_guard::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::new(2, Duration::from_secs(15 * 60)).unwrap();
/// assert_eq!(config.limit(), 2);
///
/// assert!(RateLimitConfig::new(0, Duration::from_secs(60)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    limit: u32,
    window: Duration,
}

impl RateLimitConfig {
    /// Create a policy.
    ///
    /// # Errors
    /// Returns `ConfigError::ZeroLimit` or `ConfigError::ZeroWindow` when
    /// either parameter is zero.
    pub fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { limit, window })
    }

    /// Create a policy with the window given in minutes.
    pub fn minutes(limit: u32, window_minutes: u64) -> Result<Self, ConfigError> {
        Self::new(limit, Duration::from_secs(window_minutes.saturating_mul(60)))
    }

    /// Maximum attempts per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: Duration::from_secs(DEFAULT_WINDOW_MINUTES * 60),
        }
    }
}

/// Wire form: `window_minutes` for whole-minute windows, `window_secs`
/// otherwise. Exactly one of the two may be given.
#[derive(Serialize, Deserialize)]
struct RawRateLimitConfig {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_secs: Option<u64>,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Serialize for RateLimitConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = self.window.as_secs();
        if self.window.subsec_nanos() != 0 {
            return Err(serde::ser::Error::custom(
                "window must be a whole number of seconds",
            ));
        }
        let (window_minutes, window_secs) = if secs % 60 == 0 {
            (Some(secs / 60), None)
        } else {
            (None, Some(secs))
        };
        RawRateLimitConfig {
            limit: self.limit,
            window_minutes,
            window_secs,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RateLimitConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRateLimitConfig::deserialize(deserializer)?;
        let window = match (raw.window_minutes, raw.window_secs) {
            (Some(_), Some(_)) => {
                return Err(serde::de::Error::custom(
                    "only one of `window_minutes` and `window_secs` may be set",
                ))
            }
            (Some(minutes), None) => Duration::from_secs(minutes.saturating_mul(60)),
            (None, Some(secs)) => Duration::from_secs(secs),
            (None, None) => Duration::from_secs(DEFAULT_WINDOW_MINUTES * 60),
        };
        RateLimitConfig::new(raw.limit, window).map_err(serde::de::Error::custom)
    }
}
