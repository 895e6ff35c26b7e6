//! In-process store
//!
//! `MemoryStore` gives single-process deployments and tests the same counter,
//! lock and cache semantics as Redis. Every operation takes one mutex for its
//! whole duration, which makes each call atomic the way a Redis command is.

use async_trait::async_trait;
use parking_lot::Mutex;
use routeapi_core::error::AppError;
use routeapi_core::traits::{CacheService, CounterStore};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Default)]
struct Inner {
    counters: HashMap<String, HashMap<String, i64>>,
    values: HashMap<String, Entry>,
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

impl Inner {
    /// Live value for `key`, dropping it if it has expired
    fn live_value(&mut self, key: &str, now: Instant) -> Option<&str> {
        if self.values.get(key).is_some_and(|e| !e.is_live(now)) {
            self.values.remove(key);
        }
        self.values.get(key).map(|e| e.value.as_str())
    }
}

/// Thread-safe in-memory counter store and cache
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of one counter field, `None` when the field is absent
    pub fn counter(&self, key: &str, field: &str) -> Option<i64> {
        let inner = self.inner.lock();
        inner.counters.get(key).and_then(|h| h.get(field).copied())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn increment(&self, key: &str, field: &str, by: i64) -> Result<i64, AppError> {
        let mut inner = self.inner.lock();
        let slot = inner
            .counters
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0);
        *slot += by;
        Ok(*slot)
    }

    async fn decrement(&self, key: &str, field: &str, by: i64) -> Result<i64, AppError> {
        let mut inner = self.inner.lock();
        let hash = inner.counters.entry(key.to_string()).or_default();
        let value = {
            let slot = hash.entry(field.to_string()).or_insert(0);
            *slot -= by;
            *slot
        };

        if value == 0 {
            hash.remove(field);
            if hash.is_empty() {
                inner.counters.remove(key);
            }
        }
        Ok(value)
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let inner = self.inner.lock();
        Ok(inner
            .counters
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn read_counters(&self, key: &str) -> Result<HashMap<String, i64>, AppError> {
        let inner = self.inner.lock();
        Ok(inner.counters.get(key).cloned().unwrap_or_default())
    }

    async fn try_acquire_lock(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if inner.live_value(key, now).is_some() {
            debug!("Lock {} is held", key);
            return Ok(false);
        }

        inner.values.insert(
            key.to_string(),
            Entry {
                value: owner.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release_lock(&self, key: &str, owner: &str) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if inner.live_value(key, now) == Some(owner) {
            inner.values.remove(key);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl CacheService for MemoryStore {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let now = Instant::now();
        let json = {
            let mut inner = self.inner.lock();
            inner.live_value(key, now).map(str::to_string)
        };

        match json {
            Some(json) => {
                let value = serde_json::from_str::<T>(&json).map_err(|e| {
                    AppError::Serialization(format!("Deserialization failed: {}", e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError> {
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::Serialization(format!("Serialization failed: {}", e)))?;

        let mut inner = self.inner.lock();
        inner.values.insert(
            key.to_string(),
            Entry {
                value: json,
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let existed = inner.live_value(key, now).is_some();
        inner.values.remove(key);
        Ok(existed)
    }
}
