//! Redis-backed key-value store.
//!
//! Lets several application instances share attempt records, so a visitor
//! cannot escape the rate limit by landing on a different instance.
//!
//! ## Layout
//!
//! - Keys: configurable prefix followed by the record key
//!   (`form-guard:ratelimit_contact-form`)
//! - Values: the JSON attempt array, unchanged
//! - TTL: none by default. When `ttl` is set it is refreshed on every write
//!   and must be at least the longest rate-limit window served by the store,
//!   otherwise a record can expire while its attempts still count
//!
//! `compare_and_set` runs as a WATCH/MULTI/EXEC transaction.
//!
//! ## Example
//!
//! ```rust,ignore
//! use form_guard::{FormController, RedisStore, RedisStoreConfig, SimulatedSubmitter};
//! use std::sync::Arc;
//!
//! let store = RedisStore::connect_with_config("redis://127.0.0.1/", RedisStoreConfig::default())
//!     .expect("Failed to connect to Redis");
//!
//! let controller = FormController::builder()
//!     .with_store(Arc::new(store))
//!     .build(SimulatedSubmitter::new())
//!     .unwrap();
//! ```

use crate::application::ports::{KeyValueStore, StoreError};
use redis::{Client, Commands, Connection, RedisError};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Configuration for Redis storage.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Expiry applied on every write (default: none). Must not be shorter
    /// than the rate-limit window.
    pub ttl: Option<Duration>,
    /// Key prefix for Redis keys (default: "form-guard:")
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            key_prefix: "form-guard:".to_string(),
        }
    }
}

impl RedisStoreConfig {
    /// Expire idle records once `window` has passed since their last write.
    ///
    /// A record untouched for a whole window holds no attempt that still counts.
    pub fn expiring_after(window: Duration) -> Self {
        Self {
            ttl: Some(window),
            ..Self::default()
        }
    }
}

impl From<RedisError> for StoreError {
    fn from(error: RedisError) -> Self {
        if error.is_io_error() || error.is_connection_refusal() || error.is_timeout() {
            StoreError::Unavailable(error.to_string())
        } else {
            StoreError::Backend(error.to_string())
        }
    }
}

/// Redis-backed store shared between instances.
pub struct RedisStore {
    connection: Mutex<Connection>,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis with default configuration.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1/")
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_config(url, RedisStoreConfig::default())
    }

    /// Connect to Redis with custom configuration.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub fn connect_with_config(url: &str, config: RedisStoreConfig) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let connection = client.get_connection()?;
        tracing::debug!(prefix = %config.key_prefix, "connected to redis");

        Ok(Self {
            connection: Mutex::new(connection),
            config,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }

    /// Delete every key under this store's prefix.
    pub fn clear(&self) -> Result<(), StoreError> {
        let pattern = format!("{}*", self.config.key_prefix);
        let mut conn = self.lock();
        let keys: Vec<String> = conn.scan_match::<_, String>(&pattern)?.collect();
        if !keys.is_empty() {
            conn.del::<_, ()>(&keys)?;
        }
        Ok(())
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    fn ttl_secs(&self) -> Option<u64> {
        self.config.ttl.map(|ttl| ttl.as_secs().max(1))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.lock().get(self.key(key))?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = self.key(key);
        match self.ttl_secs() {
            Some(ttl) => self.lock().set_ex::<_, _, ()>(key, value, ttl)?,
            None => self.lock().set::<_, _, ()>(key, value)?,
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().del::<_, ()>(self.key(key))?;
        Ok(())
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let full_key = self.key(key);
        let ttl = self.ttl_secs();
        let mut conn = self.lock();

        // The closure reruns if the watched key changes before EXEC, so a
        // lost race ends with a fresh comparison rather than a blind write.
        let written = redis::transaction(&mut *conn, &[&full_key], |conn, pipe| {
            let current: Option<String> = conn.get(&full_key)?;
            if current.as_deref() != expected {
                return Ok(Some(false));
            }
            match ttl {
                Some(ttl) => pipe.set_ex(&full_key, value, ttl),
                None => pipe.set(&full_key, value),
            }
            .ignore()
            .get(&full_key)
            .query::<Option<(String,)>>(conn)
            .map(|committed| committed.map(|_| true))
        })?;
        Ok(written)
    }
}
