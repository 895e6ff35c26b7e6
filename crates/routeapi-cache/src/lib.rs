//! Redis counter store and caching layer for RouteAPI
//!
//! Provides the shared, process-spanning store behind usage metering and the
//! reference lookup cache. `RedisCache` implements both `CounterStore` and
//! `CacheService` from routeapi-core over a single multiplexed connection.
//!
//! # Features
//!
//! - Connection pooling via Redis ConnectionManager
//! - Atomic hash counters (`HINCRBY`) with zero-cleanup on decrement
//! - Owned flush lock: `SET NX PX` to acquire, compare-and-delete to release
//! - JSON serialization with TTL for cached lookups
//! - `MemoryStore`, an in-process store with the same semantics
//!
//! # Example
//!
//! ```no_run
//! use routeapi_cache::RedisCache;
//! use routeapi_core::traits::CounterStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisCache::new("redis://127.0.0.1:6379").await?;
//!
//!     // Count one call for user 42 on endpoint 3
//!     let count = store.increment("epcalls:42", "3", 1).await?;
//!     assert!(count >= 1);
//!
//!     Ok(())
//! }
//! ```

pub mod keys;
pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError, Script};
use routeapi_core::error::AppError;
use routeapi_core::traits::{CacheService, CounterStore};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Decrement a hash field and drop it when it lands on zero, atomically.
const DECREMENT_SCRIPT: &str = r#"
local value = redis.call('HINCRBY', KEYS[1], ARGV[1], -tonumber(ARGV[2]))
if value == 0 then
    redis.call('HDEL', KEYS[1], ARGV[1])
end
return value
"#;

/// Delete a lock only while it still carries the caller's owner token.
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Redis store implementation with connection pooling
///
/// Wraps a Redis ConnectionManager to provide efficient, multiplexed access
/// to Redis. All operations are async and return Results with AppError.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    decrement_script: Script,
    release_script: Script,
}

impl RedisCache {
    /// Create a new Redis store instance
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns `AppError::CacheConnection` if the connection fails
    pub async fn new(url: &str) -> Result<Self, AppError> {
        debug!("Connecting to Redis at {}", url);

        let client = Client::open(url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            AppError::CacheConnection(format!("Invalid Redis URL: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to establish Redis connection: {}", e);
            AppError::CacheConnection(format!("Connection failed: {}", e))
        })?;

        debug!("Redis connection established successfully");
        Ok(Self {
            manager,
            decrement_script: Script::new(DECREMENT_SCRIPT),
            release_script: Script::new(RELEASE_LOCK_SCRIPT),
        })
    }

    /// Ping the Redis server to check connectivity
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cache` if the ping fails
    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis ping failed: {}", e);
                AppError::Cache(format!("Ping failed: {}", e))
            })?;
        Ok(())
    }

    /// Flush all keys from the current database
    ///
    /// # Warning
    ///
    /// This operation is destructive and will delete all counters and cached
    /// data. Use only in testing.
    #[cfg(test)]
    pub async fn flush_db(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Failed to flush database: {}", e);
                AppError::Cache(format!("Flush failed: {}", e))
            })?;
        Ok(())
    }

    /// Convert RedisError to AppError for value-cache operations
    fn map_redis_error(err: RedisError) -> AppError {
        match err.kind() {
            redis::ErrorKind::IoError => {
                error!("Redis I/O error: {}", err);
                AppError::CacheConnection(format!("I/O error: {}", err))
            }
            redis::ErrorKind::TypeError => {
                warn!("Redis type error: {}", err);
                AppError::Cache(format!("Type mismatch: {}", err))
            }
            _ => {
                error!("Redis error: {}", err);
                AppError::Cache(err.to_string())
            }
        }
    }

    /// Convert RedisError to AppError for counter and lock operations
    fn map_counter_error(err: RedisError) -> AppError {
        if err.kind() == redis::ErrorKind::IoError {
            error!("Redis I/O error on counter store: {}", err);
            AppError::CacheConnection(format!("I/O error: {}", err))
        } else {
            error!("Redis counter store error: {}", err);
            AppError::CounterStore(err.to_string())
        }
    }
}

#[async_trait]
impl CounterStore for RedisCache {
    async fn increment(&self, key: &str, field: &str, by: i64) -> Result<i64, AppError> {
        debug!("HINCRBY {} {} {}", key, field, by);
        let mut conn = self.manager.clone();

        let value: i64 = conn
            .hincr(key, field, by)
            .await
            .map_err(Self::map_counter_error)?;

        Ok(value)
    }

    async fn decrement(&self, key: &str, field: &str, by: i64) -> Result<i64, AppError> {
        debug!("HINCRBY {} {} -{} (drop at zero)", key, field, by);
        let mut conn = self.manager.clone();

        let value: i64 = self
            .decrement_script
            .key(key)
            .arg(field)
            .arg(by)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_counter_error)?;

        Ok(value)
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let pattern = keys::pattern(prefix);
        debug!("SCAN MATCH {}", pattern);
        let mut conn = self.manager.clone();

        let mut iter: redis::AsyncIter<String> = conn
            .scan_match(&pattern)
            .await
            .map_err(Self::map_counter_error)?;

        let mut found = Vec::new();
        while let Some(key) = iter.next_item().await {
            found.push(key);
        }

        Ok(found)
    }

    async fn read_counters(&self, key: &str) -> Result<HashMap<String, i64>, AppError> {
        debug!("HGETALL {}", key);
        let mut conn = self.manager.clone();

        let fields: HashMap<String, i64> = conn
            .hgetall(key)
            .await
            .map_err(Self::map_counter_error)?;

        Ok(fields)
    }

    async fn try_acquire_lock(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        debug!("SET {} NX PX {}", key, ttl_ms);
        let mut conn = self.manager.clone();

        // SET key value PX ttl NX - returns OK if set, nil if key exists
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(owner)
            .arg("PX")
            .arg(ttl_ms)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Failed to acquire lock {}: {}", key, e);
                AppError::Lock(e.to_string())
            })?;

        Ok(result.is_some())
    }

    async fn release_lock(&self, key: &str, owner: &str) -> Result<bool, AppError> {
        debug!("Releasing lock {}", key);
        let mut conn = self.manager.clone();

        let deleted: i64 = self
            .release_script
            .key(key)
            .arg(owner)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Failed to release lock {}: {}", key, e);
                AppError::Lock(e.to_string())
            })?;

        Ok(deleted > 0)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    /// Get a value from cache and deserialize it
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))` if the key exists and deserialization succeeds
    /// - `Ok(None)` if the key doesn't exist
    /// - `Err(AppError)` if Redis or deserialization fails
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        debug!("GET {}", key);
        let mut conn = self.manager.clone();

        let result: Option<String> = conn.get(key).await.map_err(Self::map_redis_error)?;

        match result {
            Some(json) => {
                let value = serde_json::from_str::<T>(&json).map_err(|e| {
                    error!("Failed to deserialize value for key {}: {}", key, e);
                    AppError::Serialization(format!("Deserialization failed: {}", e))
                })?;
                debug!("Cache HIT: {}", key);
                Ok(Some(value))
            }
            None => {
                debug!("Cache MISS: {}", key);
                Ok(None)
            }
        }
    }

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError> {
        debug!("SET {} (TTL: {}s)", key, ttl_secs);
        let mut conn = self.manager.clone();

        let json = serde_json::to_string(value).map_err(|e| {
            error!("Failed to serialize value for key {}: {}", key, e);
            AppError::Serialization(format!("Serialization failed: {}", e))
        })?;

        let _: () = conn
            .set_ex(key, json, ttl_secs)
            .await
            .map_err(Self::map_redis_error)?;

        Ok(())
    }

    /// Delete a key from cache
    ///
    /// `Ok(true)` if the key was deleted, `Ok(false)` if it didn't exist
    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        debug!("DEL {}", key);
        let mut conn = self.manager.clone();

        let deleted: i32 = conn.del(key).await.map_err(Self::map_redis_error)?;

        Ok(deleted > 0)
    }
}
