//! Observability metrics for form guarding.
//!
//! Counts what happened to submissions and rate-limit attempts so the host
//! application can export them however it likes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking submission and rate limiting statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Submissions delivered by the submitter
    submissions_accepted: AtomicU64,
    /// Submissions the submitter failed to deliver
    submissions_failed: AtomicU64,
    /// Submissions discarded because the honeypot was filled
    bots_trapped: AtomicU64,
    /// Submissions rejected by the rate limiter
    rate_limited: AtomicU64,
    /// Submissions rejected by field validation
    validation_failures: AtomicU64,
    /// Rate-limit attempts admitted (including fail-open)
    attempts_allowed: AtomicU64,
    /// Rate-limit attempts blocked
    attempts_blocked: AtomicU64,
    /// Store errors absorbed by the limiter
    storage_failures: AtomicU64,
}

macro_rules! counter {
    ($record:ident, $read:ident, $field:ident) => {
        pub(crate) fn $record(&self) {
            self.inner.$field.fetch_add(1, Ordering::Relaxed);
        }

        pub fn $read(&self) -> u64 {
            self.inner.$field.load(Ordering::Relaxed)
        }
    };
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    counter!(record_submission_accepted, submissions_accepted, submissions_accepted);
    counter!(record_submission_failed, submissions_failed, submissions_failed);
    counter!(record_bot_trapped, bots_trapped, bots_trapped);
    counter!(record_rate_limited, rate_limited, rate_limited);
    counter!(record_validation_failure, validation_failures, validation_failures);
    counter!(record_attempt_allowed, attempts_allowed, attempts_allowed);
    counter!(record_attempt_blocked, attempts_blocked, attempts_blocked);
    counter!(record_storage_failure, storage_failures, storage_failures);

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submissions_accepted: self.submissions_accepted(),
            submissions_failed: self.submissions_failed(),
            bots_trapped: self.bots_trapped(),
            rate_limited: self.rate_limited(),
            validation_failures: self.validation_failures(),
            attempts_allowed: self.attempts_allowed(),
            attempts_blocked: self.attempts_blocked(),
            storage_failures: self.storage_failures(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        for counter in [
            &self.inner.submissions_accepted,
            &self.inner.submissions_failed,
            &self.inner.bots_trapped,
            &self.inner.rate_limited,
            &self.inner.validation_failures,
            &self.inner.attempts_allowed,
            &self.inner.attempts_blocked,
            &self.inner.storage_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submissions_accepted: u64,
    pub submissions_failed: u64,
    pub bots_trapped: u64,
    pub rate_limited: u64,
    pub validation_failures: u64,
    pub attempts_allowed: u64,
    pub attempts_blocked: u64,
    pub storage_failures: u64,
}

impl MetricsSnapshot {
    /// Submissions that reached any terminal outcome.
    pub fn total_submissions(&self) -> u64 {
        self.submissions_accepted
            .saturating_add(self.submissions_failed)
            .saturating_add(self.bots_trapped)
            .saturating_add(self.rate_limited)
            .saturating_add(self.validation_failures)
    }

    /// Ratio of blocked to checked rate-limit attempts (0.0 to 1.0).
    pub fn block_rate(&self) -> f64 {
        let total = self.attempts_allowed.saturating_add(self.attempts_blocked);
        if total == 0 {
            0.0
        } else {
            self.attempts_blocked as f64 / total as f64
        }
    }
}
