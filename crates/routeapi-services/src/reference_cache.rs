//! Read-through cache over the reference data reader
//!
//! Reference tables only change on bulk reloads, so rate-center and carrier
//! name lookups are cached in the shared cache for a short TTL. Misses are
//! cached too (as JSON `null`) since most lookups for unassigned blocks
//! repeat. Cache faults fall through to the reader. Without a cache the
//! decorator passes every call straight through.

use async_trait::async_trait;
use routeapi_cache::keys;
use routeapi_core::{
    models::{LocalAgreement, NumberPoolBlock, PortabilityRecord, RateCenterRecord},
    traits::{CacheService, ReferenceDataReader},
    AppResult,
};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Reference reader decorator that caches immutable lookups
pub struct CachedReferenceReader<R, C> {
    inner: Arc<R>,
    cache: Option<Arc<C>>,
    ttl_secs: u64,
}

impl<R, C> CachedReferenceReader<R, C>
where
    R: ReferenceDataReader,
    C: CacheService,
{
    /// Wrap `inner`, caching lookups in `cache` for `ttl_secs`
    pub fn new(inner: Arc<R>, cache: Arc<C>, ttl_secs: u64) -> Self {
        Self {
            inner,
            cache: Some(cache),
            ttl_secs,
        }
    }

    /// Wrap `inner` without caching
    pub fn uncached(inner: Arc<R>) -> Self {
        Self {
            inner,
            cache: None,
            ttl_secs: 0,
        }
    }

    /// Cached value for `key`, or `load` and remember the result
    async fn read_through<T, F>(&self, key: String, load: F) -> AppResult<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Future<Output = AppResult<Option<T>>> + Send,
    {
        let Some(cache) = &self.cache else {
            return load.await;
        };

        match cache.get::<Option<T>>(&key).await {
            Ok(Some(cached)) => {
                debug!("Reference cache HIT: {}", key);
                return Ok(cached);
            }
            Ok(None) => debug!("Reference cache MISS: {}", key),
            Err(e) => warn!("Reference cache error for {}: {}", key, e),
        }

        let value = load.await?;

        if let Err(e) = cache.set(&key, &value, self.ttl_secs).await {
            warn!("Failed to cache reference lookup {}: {}", key, e);
        }

        Ok(value)
    }
}

#[async_trait]
impl<R, C> ReferenceDataReader for CachedReferenceReader<R, C>
where
    R: ReferenceDataReader,
    C: CacheService,
{
    #[instrument(skip(self))]
    async fn find_rate_center(&self, npanxx: &str) -> AppResult<Option<RateCenterRecord>> {
        self.read_through(
            keys::rate_center_key(npanxx),
            self.inner.find_rate_center(npanxx),
        )
        .await
    }

    async fn has_local_agreement(&self, agreement: &LocalAgreement) -> AppResult<bool> {
        self.inner.has_local_agreement(agreement).await
    }

    async fn find_portability(&self, ten_digit: &str) -> AppResult<Option<PortabilityRecord>> {
        self.inner.find_portability(ten_digit).await
    }

    async fn find_pool_block(&self, npanxxx: &str) -> AppResult<Option<NumberPoolBlock>> {
        self.inner.find_pool_block(npanxxx).await
    }

    #[instrument(skip(self))]
    async fn find_spid_name(&self, spid: &str) -> AppResult<Option<String>> {
        self.read_through(keys::spid_name_key(spid), self.inner.find_spid_name(spid))
            .await
    }

    #[instrument(skip(self))]
    async fn find_simplified_name(&self, carrier_spec_name: &str) -> AppResult<Option<String>> {
        self.read_through(
            keys::simple_name_key(carrier_spec_name),
            self.inner.find_simplified_name(carrier_spec_name),
        )
        .await
    }

    async fn find_nnmp(&self, carrier_spec_name: &str) -> AppResult<Option<i32>> {
        self.inner.find_nnmp(carrier_spec_name).await
    }
}
