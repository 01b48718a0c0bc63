//! Rate limiter coordination logic.
//!
//! The rate limiter keeps one attempt log per key in a `KeyValueStore` and
//! re-evaluates it lazily on every check; there is no background timer.
//!
//! # Fail-Open Behavior
//! Any storage failure (store disabled, quota exceeded, lost optimistic
//! updates) makes `check` allow the attempt without recording it, logging a
//! warning. Infrastructure trouble never blocks a legitimate submission.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, KeyValueStore, StoreError};
use crate::domain::attempts::{storage_key, AttemptLog};
use crate::domain::policy::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tries per check in `UpdateMode::CompareAndSwap` before giving up.
pub const MAX_CAS_ATTEMPTS: u32 = 8;

/// How an admitted attempt is written back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Plain read, filter, append, write.
    ///
    /// Two callers that read before either writes can both be admitted past
    /// the limit, and the later write wins.
    #[default]
    ReadModifyWrite,
    /// Write with `compare_and_set` and retry on conflict, so concurrent
    /// callers never over-admit. Requires a store that supports it.
    CompareAndSwap,
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The attempt was admitted
    Allowed {
        /// Attempts left in the current window; `None` when the limiter
        /// failed open and nothing was recorded
        remaining_attempts: Option<u32>,
    },
    /// The key is over its limit
    Blocked {
        /// Whole minutes until the oldest attempt leaves the window
        remaining_minutes: u64,
        /// User-facing explanation
        message: String,
    },
}

impl RateLimitDecision {
    fn fail_open() -> Self {
        RateLimitDecision::Allowed {
            remaining_attempts: None,
        }
    }

    fn blocked(remaining_minutes: u64) -> Self {
        RateLimitDecision::Blocked {
            remaining_minutes,
            message: format!(
                "Too many attempts. Please wait {} minute(s).",
                remaining_minutes
            ),
        }
    }

    /// Check if the attempt was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    /// Check if the attempt was rejected.
    pub fn is_blocked(&self) -> bool {
        matches!(self, RateLimitDecision::Blocked { .. })
    }

    /// Attempts left after an admitted attempt.
    pub fn remaining_attempts(&self) -> Option<u32> {
        match self {
            RateLimitDecision::Allowed { remaining_attempts } => *remaining_attempts,
            RateLimitDecision::Blocked { .. } => None,
        }
    }

    /// Minutes to wait after a rejection.
    pub fn remaining_minutes(&self) -> Option<u64> {
        match self {
            RateLimitDecision::Blocked {
                remaining_minutes, ..
            } => Some(*remaining_minutes),
            RateLimitDecision::Allowed { .. } => None,
        }
    }

    /// Rejection message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            RateLimitDecision::Blocked { message, .. } => Some(message),
            RateLimitDecision::Allowed { .. } => None,
        }
    }
}

/// Sliding-window rate limiter over an injected store and clock.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
    mode: UpdateMode,
    metrics: Metrics,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `store` - Where attempt logs live (`ratelimit_<key>`)
    /// * `clock` - Time source for attempt timestamps
    /// * `config` - Policy used by `check`
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: RateLimitConfig) -> Self {
        Self {
            store,
            clock,
            config,
            mode: UpdateMode::default(),
            metrics: Metrics::new(),
        }
    }

    /// Select how admitted attempts are written back.
    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Report into a shared metrics tracker.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Check `key` against the limiter's default policy.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_with(key, &self.config)
    }

    /// Check `key` against an explicit policy and record the attempt if it
    /// is admitted. Rejected attempts are never recorded.
    pub fn check_with(&self, key: &str, config: &RateLimitConfig) -> RateLimitDecision {
        let decision = match self.try_check(key, config) {
            Ok(decision) => decision,
            Err(error) => {
                tracing::warn!(
                    key = %key,
                    error = %error,
                    "rate limiting unavailable, allowing attempt"
                );
                self.metrics.record_storage_failure();
                RateLimitDecision::fail_open()
            }
        };

        match &decision {
            RateLimitDecision::Allowed { remaining_attempts } => {
                tracing::debug!(key = %key, remaining = ?remaining_attempts, "attempt allowed");
                self.metrics.record_attempt_allowed();
            }
            RateLimitDecision::Blocked {
                remaining_minutes, ..
            } => {
                tracing::debug!(key = %key, remaining_minutes, "attempt blocked");
                self.metrics.record_attempt_blocked();
            }
        }

        decision
    }

    /// Forget every attempt recorded for `key`.
    ///
    /// Storage failures are logged and swallowed.
    pub fn reset(&self, key: &str) {
        if let Err(error) = self.store.remove(&storage_key(key)) {
            tracing::warn!(key = %key, error = %error, "could not reset rate limit");
            self.metrics.record_storage_failure();
        }
    }

    /// Attempts currently inside the window for `key`, without recording one.
    pub fn attempts_in_window(&self, key: &str) -> Result<usize, StoreError> {
        let mut log = self.load(&storage_key(key))?.1;
        log.expire(self.clock.now_millis(), self.config.window());
        Ok(log.len())
    }

    /// Get the default policy.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Get the update mode.
    pub fn update_mode(&self) -> UpdateMode {
        self.mode
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn try_check(&self, key: &str, config: &RateLimitConfig) -> Result<RateLimitDecision, StoreError> {
        let record_key = storage_key(key);
        let tries = match self.mode {
            UpdateMode::ReadModifyWrite => 1,
            UpdateMode::CompareAndSwap => MAX_CAS_ATTEMPTS,
        };

        for _ in 0..tries {
            let now = self.clock.now_millis();
            let (raw, mut log) = self.load(&record_key)?;
            log.expire(now, config.window());

            let limit = usize::try_from(config.limit()).unwrap_or(usize::MAX);
            if log.len() >= limit {
                return Ok(RateLimitDecision::blocked(
                    log.minutes_until_slot(now, config.window()),
                ));
            }

            log.record(now);
            let encoded = log.to_json();
            let written = match self.mode {
                UpdateMode::ReadModifyWrite => {
                    self.store.set(&record_key, &encoded)?;
                    true
                }
                UpdateMode::CompareAndSwap => {
                    self.store
                        .compare_and_set(&record_key, raw.as_deref(), &encoded)?
                }
            };

            if written {
                let used = u32::try_from(log.len()).unwrap_or(u32::MAX);
                return Ok(RateLimitDecision::Allowed {
                    remaining_attempts: Some(config.limit().saturating_sub(used)),
                });
            }
            tracing::debug!(key = %key, "concurrent update detected, retrying");
        }

        Err(StoreError::Contention { attempts: tries })
    }

    /// Load the raw record and its decoded log. An unreadable record decodes
    /// as an empty log and is overwritten by the next admitted attempt.
    fn load(&self, record_key: &str) -> Result<(Option<String>, AttemptLog), StoreError> {
        let raw = self.store.get(record_key)?;
        let log = match raw.as_deref() {
            None => AttemptLog::new(),
            Some(text) => AttemptLog::from_json(text).unwrap_or_else(|error| {
                tracing::warn!(
                    key = %record_key,
                    error = %error,
                    "discarding unreadable rate limit record"
                );
                AttemptLog::new()
            }),
        };
        Ok((raw, log))
    }
}
