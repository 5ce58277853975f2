use crate::error::{AnalyticsError, CacheError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Storage backend for raw report payloads.
///
/// Values are serialized report responses. Implementations must be shareable
/// across threads; the executor holds them behind an `Arc`.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove an entry. Returns `true` if something was removed.
    fn forget(&self, key: &str) -> Result<bool, CacheError>;

    /// Return the live value under `key`, or run `compute` and store its result.
    ///
    /// The default implementation is not atomic: two callers missing at the same
    /// time will both run `compute`. Backends that can lock per key should
    /// override it.
    fn remember(
        &self,
        key: &str,
        ttl: Duration,
        compute: &mut dyn FnMut() -> Result<String, AnalyticsError>,
    ) -> Result<String, AnalyticsError> {
        if let Some(value) = self.get(key)? {
            return Ok(value);
        }
        let value = compute()?;
        self.set(key, value.clone(), ttl)?;
        Ok(value)
    }
}

/// Thread-safe in-memory cache with per-entry TTL expiration.
///
/// `remember` holds a per-key lock around the miss path, so concurrent callers
/// asking for the same key share a single computation.
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    key_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

struct CacheEntry {
    value: String,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.value.clone())
            }
        })
    }

    fn insert(&self, key: &str, value: String, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.entries.lock().insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.key_locks.lock().entry(key.to_string()).or_default())
    }

    fn release_key_lock(&self, key: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.key_locks.lock();
        // One reference lives in the map and one is ours; anyone else waiting
        // would have cloned it under this same map lock.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(key);
        }
    }

    /// Remove expired entries from the cache.
    pub fn cleanup_expired(&self) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| !entry.is_expired());
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns the number of entries currently in the cache.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the cache contains no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheStore for QueryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.lookup(key))
    }

    fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.insert(key, value, ttl);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    fn remember(
        &self,
        key: &str,
        ttl: Duration,
        compute: &mut dyn FnMut() -> Result<String, AnalyticsError>,
    ) -> Result<String, AnalyticsError> {
        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        let lock = self.key_lock(key);
        let result = {
            let _guard = lock.lock();
            // Another caller may have filled the entry while we waited.
            if let Some(value) = self.lookup(key) {
                Ok(value)
            } else {
                compute().map(|value| {
                    self.insert(key, value.clone(), ttl);
                    value
                })
            }
        };
        self.release_key_lock(key, &lock);
        result
    }
}
