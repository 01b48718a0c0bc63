//! Failing key-value stores for exercising the fail-open paths.

use crate::application::ports::{KeyValueStore, StoreError};

/// Store that rejects every operation, like a browser with storage disabled.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    /// Create a store that reports "storage disabled".
    pub fn new() -> Self {
        Self::with_reason("storage disabled")
    }

    /// Create a store that reports a custom reason.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> StoreError {
        StoreError::Unavailable(self.reason.clone())
    }
}

impl Default for UnavailableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(self.error())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(self.error())
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(self.error())
    }

    fn compare_and_set(
        &self,
        _key: &str,
        _expected: Option<&str>,
        _value: &str,
    ) -> Result<bool, StoreError> {
        Err(self.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_operation_fails() {
        let store = UnavailableStore::with_reason("private mode");
        let expected = StoreError::Unavailable("private mode".to_string());

        assert_eq!(store.get("k"), Err(expected.clone()));
        assert_eq!(store.set("k", "v"), Err(expected.clone()));
        assert_eq!(store.remove("k"), Err(expected.clone()));
        assert_eq!(store.compare_and_set("k", None, "v"), Err(expected));
    }
}
