//! In-process key-value store.
//!
//! Provides concurrent, sharded storage for attempt records.

use crate::application::ports::{KeyValueStore, StoreError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Thread-safe sharded store backed by DashMap.
///
/// Optionally enforces a byte quota (keys plus values) so that a full store
/// can be exercised the way a browser's origin storage fills up. Usage is a
/// running counter adjusted while the written key's entry is locked, so
/// concurrent writers never push it past the quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: DashMap<String, String>,
    used: AtomicUsize,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes beyond `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.map.retain(|key, value| {
            self.used.fetch_sub(key.len() + value.len(), Ordering::AcqRel);
            false
        });
    }

    /// Bytes currently held (keys plus values).
    pub fn used_bytes(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Account for an entry changing from `old` to `new` bytes.
    ///
    /// Callers hold the entry lock of the key being resized.
    fn resize(&self, old: usize, new: usize) -> Result<(), StoreError> {
        if new <= old {
            self.used.fetch_sub(old - new, Ordering::AcqRel);
            return Ok(());
        }

        let grow = new - old;
        let Some(quota) = self.quota else {
            self.used.fetch_add(grow, Ordering::AcqRel);
            return Ok(());
        };
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(grow).filter(|projected| *projected <= quota)
            })
            .map(|_| ())
            .map_err(|_| StoreError::QuotaExceeded)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.get(key).map(|value| value.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let size = key.len() + value.len();
        match self.map.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                self.resize(key.len() + entry.get().len(), size)?;
                entry.insert(value.to_string());
            }
            Entry::Vacant(entry) => {
                self.resize(0, size)?;
                entry.insert(value.to_string());
            }
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if let Some((key, value)) = self.map.remove(key) {
            self.used.fetch_sub(key.len() + value.len(), Ordering::AcqRel);
        }
        Ok(())
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let size = key.len() + value.len();
        match self.map.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if expected != Some(entry.get().as_str()) {
                    return Ok(false);
                }
                self.resize(key.len() + entry.get().len(), size)?;
                entry.insert(value.to_string());
            }
            Entry::Vacant(entry) => {
                if expected.is_some() {
                    return Ok(false);
                }
                self.resize(0, size)?;
                entry.insert(value.to_string());
            }
        }
        Ok(true)
    }
}
