//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::submission::SanitizedSubmission;
use std::fmt::{self, Debug};
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

/// Port for obtaining current wall-clock time.
///
/// Attempt records are persisted, so time is wall-clock rather than
/// monotonic. Infrastructure provides `SystemClock` and, for tests,
/// `MockClock`.
pub trait Clock: Send + Sync + Debug {
    /// Get the current time.
    fn now(&self) -> SystemTime;

    /// Current time as milliseconds since the Unix epoch.
    ///
    /// Times before the epoch read as 0.
    fn now_millis(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Error reported by a key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store is disabled or cannot be reached
    Unavailable(String),
    /// Writing would exceed the store's capacity
    QuotaExceeded,
    /// The operation is not supported by this store
    Unsupported(&'static str),
    /// Optimistic updates kept losing to concurrent writers
    Contention {
        /// Attempts made before giving up
        attempts: u32,
    },
    /// Backend-specific failure
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(reason) => write!(f, "store unavailable: {}", reason),
            StoreError::QuotaExceeded => write!(f, "store quota exceeded"),
            StoreError::Unsupported(operation) => {
                write!(f, "store does not support {}", operation)
            }
            StoreError::Contention { attempts } => {
                write!(f, "update lost to concurrent writers {} times", attempts)
            }
            StoreError::Backend(reason) => write!(f, "store backend error: {}", reason),
        }
    }
}

impl std::error::Error for StoreError {}

/// Port for a persistent string key-value store scoped to one origin.
///
/// This is the capability the rate limiter keeps its attempt records in.
/// Plain `get`/`set` gives read-modify-write semantics with a known race
/// between concurrent writers; stores that can do better implement
/// `compare_and_set`.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Write `value` only if the current value equals `expected`
    /// (`None` meaning "absent").
    ///
    /// # Returns
    /// `Ok(true)` if the value was written, `Ok(false)` if the current value
    /// did not match.
    fn compare_and_set(
        &self,
        _key: &str,
        _expected: Option<&str>,
        _value: &str,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Unsupported("compare_and_set"))
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        (**self).compare_and_set(key, expected, value)
    }
}

/// Error returned by a submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitError {
    reason: String,
}

impl SubmitError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "submission failed: {}", self.reason)
    }
}

impl std::error::Error for SubmitError {}

/// Port for delivering an accepted submission (email relay, HTTP API, ...).
pub trait Submitter: Send + Sync {
    /// Deliver a validated, sanitized submission.
    fn submit(
        &self,
        submission: &SanitizedSubmission,
    ) -> impl Future<Output = Result<(), SubmitError>> + Send;
}
