//! Collaborator traits
//!
//! The core consumes three external collaborators: a read-only reference data
//! reader, an atomic key-value counter store, and a durable ledger sink.
//! Concrete implementations live in `routeapi-db` and `routeapi-cache`.

use crate::error::AppError;
use crate::models::{
    EndpointRate, LedgerTotals, LocalAgreement, NumberPoolBlock, PortabilityRecord,
    RateCenterRecord, UsageLedgerEntry,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Read-only access to the telephony reference tables.
///
/// A miss is `Ok(None)`; errors mean the store itself failed.
#[async_trait]
pub trait ReferenceDataReader: Send + Sync {
    /// Find the rate-center record for a 6-digit NPANXX
    async fn find_rate_center(&self, npanxx: &str) -> Result<Option<RateCenterRecord>, AppError>;

    /// Check for an explicit local-calling agreement in the given direction
    async fn has_local_agreement(&self, agreement: &LocalAgreement) -> Result<bool, AppError>;

    /// Find the per-TN portability record for a canonical 10-digit number
    async fn find_portability(&self, ten_digit: &str) -> Result<Option<PortabilityRecord>, AppError>;

    /// Find the thousand-block record for a 7-digit NPANXXX
    async fn find_pool_block(&self, npanxxx: &str) -> Result<Option<NumberPoolBlock>, AppError>;

    /// Display name for a service provider id
    async fn find_spid_name(&self, spid: &str) -> Result<Option<String>, AppError>;

    /// Simplified display name for a carrier spec name
    async fn find_simplified_name(&self, carrier_spec_name: &str)
        -> Result<Option<String>, AppError>;

    /// National numbering plan code for a carrier spec name (case-insensitive)
    async fn find_nnmp(&self, carrier_spec_name: &str) -> Result<Option<i32>, AppError>;
}

/// Shared, process-spanning counter store.
///
/// Counters are hash fields: one hash per user, one field per endpoint.
/// Every mutation is a single atomic operation in the store.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add `by` to a counter field, returning the new value
    async fn increment(&self, key: &str, field: &str, by: i64) -> Result<i64, AppError>;

    /// Atomically subtract `by` from a counter field, removing the field when
    /// it reaches exactly zero. Returns the new value.
    async fn decrement(&self, key: &str, field: &str, by: i64) -> Result<i64, AppError>;

    /// All counter keys starting with `prefix`
    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, AppError>;

    /// Snapshot of every field of one counter key
    async fn read_counters(&self, key: &str) -> Result<HashMap<String, i64>, AppError>;

    /// Set `key` to `owner` only if absent, expiring after `ttl`.
    /// Returns `true` when this caller now holds the lock.
    async fn try_acquire_lock(&self, key: &str, owner: &str, ttl: Duration)
        -> Result<bool, AppError>;

    /// Delete `key` only if it still holds `owner`.
    /// Returns `true` when the lock was released by this call.
    async fn release_lock(&self, key: &str, owner: &str) -> Result<bool, AppError>;
}

/// Durable, append-only sink for ledger rows
#[async_trait]
pub trait LedgerSink: Send + Sync {
    /// Append one ledger entry
    async fn append(&self, entry: &UsageLedgerEntry) -> Result<(), AppError>;

    /// Summed ledger rows for a (user, endpoint) pair
    async fn totals(&self, user_id: i32, endpoint_id: i32) -> Result<LedgerTotals, AppError>;
}

/// Source of per-call prices used to compute ledger amounts
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Effective rate for a user on an endpoint at a point in time
    async fn find_endpoint_rate(
        &self,
        user_id: i32,
        endpoint_id: i32,
        at: DateTime<Utc>,
    ) -> Result<Option<EndpointRate>, AppError>;
}

/// Cache service trait
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Get value from cache
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError>;

    /// Set value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError>;

    /// Delete value from cache
    async fn delete(&self, key: &str) -> Result<bool, AppError>;
}
