//! Service wiring
//!
//! `RouteCore` builds the database pool and the Redis client once and hands
//! the same handles to the request path and to the flush coordinator.

use routeapi_cache::RedisCache;
use routeapi_core::{models::LedgerTotals, traits::LedgerSink, AppConfig, AppResult};
use routeapi_db::{
    create_pool, PgEndpointRateRepository, PgLedgerRepository, PgPool, PgReferenceRepository,
};
use std::sync::Arc;
use tracing::info;

use crate::flush::FlushCoordinator;
use crate::lookup::MeteredLookup;
use crate::metering::UsageMeter;
use crate::reference_cache::CachedReferenceReader;
use crate::resolution::ResolutionEngine;

/// Reference reader used in production
pub type ReferenceReader = CachedReferenceReader<PgReferenceRepository, RedisCache>;

/// Metered lookup front end used in production
pub type Lookup = MeteredLookup<ReferenceReader, RedisCache>;

/// Flush coordinator used in production
pub type Coordinator = FlushCoordinator<RedisCache, PgLedgerRepository, PgEndpointRateRepository>;

/// Process-wide service graph
pub struct RouteCore {
    pool: PgPool,
    store: Arc<RedisCache>,
    ledger: Arc<PgLedgerRepository>,
    lookup: Arc<Lookup>,
    coordinator: Arc<Coordinator>,
}

impl RouteCore {
    /// Connect to PostgreSQL and Redis and build every service
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let pool = create_pool(&config.database).await?;
        let store = Arc::new(RedisCache::new(&config.redis.url).await?);
        store.ping().await?;
        info!("Redis connection verified");

        let repository = Arc::new(PgReferenceRepository::new(pool.clone()));
        let reader: ReferenceReader = if config.resolution.cache_enabled {
            CachedReferenceReader::new(
                repository,
                Arc::clone(&store),
                config.resolution.cache_ttl_secs,
            )
        } else {
            CachedReferenceReader::uncached(repository)
        };

        let engine = ResolutionEngine::new(Arc::new(reader));
        let meter = UsageMeter::new(Arc::clone(&store), config.metering.counter_prefix.clone());
        let lookup = Arc::new(MeteredLookup::new(engine, meter));

        let ledger = Arc::new(PgLedgerRepository::new(pool.clone()));
        let rates = Arc::new(PgEndpointRateRepository::new(pool.clone()));
        let coordinator = Arc::new(FlushCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            rates,
            config.metering.clone(),
        ));

        Ok(Self {
            pool,
            store,
            ledger,
            lookup,
            coordinator,
        })
    }

    pub fn lookup(&self) -> &Arc<Lookup> {
        &self.lookup
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<RedisCache> {
        &self.store
    }

    /// Summed ledger rows for a (user, endpoint) pair
    pub async fn ledger_totals(&self, user_id: i32, endpoint_id: i32) -> AppResult<LedgerTotals> {
        self.ledger.totals(user_id, endpoint_id).await
    }

    /// Close the database pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}
