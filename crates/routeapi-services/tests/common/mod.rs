//! Shared fixtures for service integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use routeapi_cache::MemoryStore;
use routeapi_core::{
    config::{LedgerFailurePolicy, MeteringConfig},
    models::{
        EndpointRate, LedgerTotals, LocalAgreement, NumberPoolBlock, PortabilityRecord,
        RateCenterRecord, UsageLedgerEntry,
    },
    traits::{CounterStore, LedgerSink, RateSource, ReferenceDataReader},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

// ==================== Reference data ====================

/// In-memory reference tables
#[derive(Default)]
pub struct InMemoryReference {
    rate_centers: HashMap<String, RateCenterRecord>,
    agreements: HashSet<LocalAgreement>,
    portability: HashMap<String, PortabilityRecord>,
    pool_blocks: HashMap<String, NumberPoolBlock>,
    spid_names: HashMap<String, String>,
    simplified_names: HashMap<String, String>,
    nnmp: HashMap<String, i32>,
}

pub fn rate_center(npanxx: &str, state: &str, lata: &str, rc: &str) -> RateCenterRecord {
    RateCenterRecord {
        npanxx: npanxx.to_string(),
        state: state.to_string(),
        lata: lata.to_string(),
        rate_center: rc.to_string(),
        ..Default::default()
    }
}

impl InMemoryReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate_center(mut self, record: RateCenterRecord) -> Self {
        self.rate_centers.insert(record.npanxx.clone(), record);
        self
    }

    /// Agreement from the rate center of `from` to that of `to`
    pub fn with_agreement(mut self, from: &str, to: &str) -> Self {
        let agreement = self.rate_centers[from].agreement_to(&self.rate_centers[to]);
        self.agreements.insert(agreement);
        self
    }

    pub fn with_ported(mut self, record: PortabilityRecord) -> Self {
        self.portability.insert(record.tn.clone(), record);
        self
    }

    pub fn with_pool_block(mut self, block: NumberPoolBlock) -> Self {
        self.pool_blocks.insert(block.npanxxx.clone(), block);
        self
    }

    pub fn with_spid_name(mut self, spid: &str, name: &str) -> Self {
        self.spid_names.insert(spid.to_string(), name.to_string());
        self
    }

    pub fn with_simplified_name(mut self, spec: &str, name: &str) -> Self {
        self.simplified_names.insert(spec.to_string(), name.to_string());
        self
    }

    pub fn with_nnmp(mut self, spec: &str, nnmp: i32) -> Self {
        self.nnmp.insert(spec.to_uppercase(), nnmp);
        self
    }
}

#[async_trait]
impl ReferenceDataReader for InMemoryReference {
    async fn find_rate_center(&self, npanxx: &str) -> AppResult<Option<RateCenterRecord>> {
        Ok(self.rate_centers.get(npanxx).cloned())
    }

    async fn has_local_agreement(&self, agreement: &LocalAgreement) -> AppResult<bool> {
        Ok(self.agreements.contains(agreement))
    }

    async fn find_portability(&self, ten_digit: &str) -> AppResult<Option<PortabilityRecord>> {
        Ok(self.portability.get(ten_digit).cloned())
    }

    async fn find_pool_block(&self, npanxxx: &str) -> AppResult<Option<NumberPoolBlock>> {
        Ok(self.pool_blocks.get(npanxxx).cloned())
    }

    async fn find_spid_name(&self, spid: &str) -> AppResult<Option<String>> {
        Ok(self.spid_names.get(spid).cloned())
    }

    async fn find_simplified_name(&self, spec: &str) -> AppResult<Option<String>> {
        Ok(self.simplified_names.get(spec).cloned())
    }

    async fn find_nnmp(&self, spec: &str) -> AppResult<Option<i32>> {
        Ok(self.nnmp.get(&spec.to_uppercase()).copied())
    }
}

// ==================== Ledgers ====================

/// Ledger that keeps every appended entry
#[derive(Default)]
pub struct RecordingLedger {
    entries: Mutex<Vec<UsageLedgerEntry>>,
}

impl RecordingLedger {
    pub fn entries(&self) -> Vec<UsageLedgerEntry> {
        self.entries.lock().clone()
    }

    pub fn total_count(&self) -> i64 {
        self.entries.lock().iter().map(|e| e.count).sum()
    }

    fn push(&self, entry: &UsageLedgerEntry) {
        self.entries.lock().push(entry.clone());
    }

    fn sum(&self, user_id: i32, endpoint_id: i32) -> LedgerTotals {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.user_id == user_id && e.endpoint_id == endpoint_id)
            .fold(LedgerTotals::default(), |acc, e| LedgerTotals {
                count: acc.count + e.count,
                amount: acc.amount + e.amount,
            })
    }
}

#[async_trait]
impl LedgerSink for RecordingLedger {
    async fn append(&self, entry: &UsageLedgerEntry) -> AppResult<()> {
        self.push(entry);
        Ok(())
    }

    async fn totals(&self, user_id: i32, endpoint_id: i32) -> AppResult<LedgerTotals> {
        Ok(self.sum(user_id, endpoint_id))
    }
}

/// Ledger whose first `failures` appends fail
pub struct FailingLedger {
    remaining_failures: AtomicUsize,
    inner: RecordingLedger,
}

impl FailingLedger {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            inner: RecordingLedger::default(),
        }
    }

    pub fn total_count(&self) -> i64 {
        self.inner.total_count()
    }
}

#[async_trait]
impl LedgerSink for FailingLedger {
    async fn append(&self, entry: &UsageLedgerEntry) -> AppResult<()> {
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::Ledger("connection reset".to_string()));
        }
        self.inner.push(entry);
        Ok(())
    }

    async fn totals(&self, user_id: i32, endpoint_id: i32) -> AppResult<LedgerTotals> {
        Ok(self.inner.sum(user_id, endpoint_id))
    }
}

/// Ledger that holds each append until the test opens the gate
pub struct GatedLedger {
    pub entered: Notify,
    gate: Semaphore,
    inner: RecordingLedger,
}

impl GatedLedger {
    pub fn new() -> Self {
        Self {
            entered: Notify::new(),
            gate: Semaphore::new(0),
            inner: RecordingLedger::default(),
        }
    }

    pub fn open(&self, appends: usize) {
        self.gate.add_permits(appends);
    }

    pub fn total_count(&self) -> i64 {
        self.inner.total_count()
    }
}

#[async_trait]
impl LedgerSink for GatedLedger {
    async fn append(&self, entry: &UsageLedgerEntry) -> AppResult<()> {
        self.entered.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        permit.forget();
        self.inner.push(entry);
        Ok(())
    }

    async fn totals(&self, user_id: i32, endpoint_id: i32) -> AppResult<LedgerTotals> {
        Ok(self.inner.sum(user_id, endpoint_id))
    }
}

/// Ledger that stalls every append
pub struct StalledLedger {
    pub delay: Duration,
    inner: RecordingLedger,
}

impl StalledLedger {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: RecordingLedger::default(),
        }
    }

    pub fn total_count(&self) -> i64 {
        self.inner.total_count()
    }
}

#[async_trait]
impl LedgerSink for StalledLedger {
    async fn append(&self, entry: &UsageLedgerEntry) -> AppResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.push(entry);
        Ok(())
    }

    async fn totals(&self, user_id: i32, endpoint_id: i32) -> AppResult<LedgerTotals> {
        Ok(self.inner.sum(user_id, endpoint_id))
    }
}

// ==================== Counter store ====================

/// Store that can stall after applying a decrement or before an increment
pub struct StallingStore {
    pub inner: Arc<MemoryStore>,
    stall: Duration,
    stall_decrements: AtomicBool,
    stall_increments: AtomicBool,
}

impl StallingStore {
    pub fn new(inner: Arc<MemoryStore>, stall: Duration) -> Self {
        Self {
            inner,
            stall,
            stall_decrements: AtomicBool::new(false),
            stall_increments: AtomicBool::new(false),
        }
    }

    pub fn stall_decrements(&self) {
        self.stall_decrements.store(true, Ordering::SeqCst);
    }

    pub fn stall_increments(&self) {
        self.stall_increments.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CounterStore for StallingStore {
    async fn increment(&self, key: &str, field: &str, by: i64) -> AppResult<i64> {
        if self.stall_increments.load(Ordering::SeqCst) {
            tokio::time::sleep(self.stall).await;
        }
        self.inner.increment(key, field, by).await
    }

    async fn decrement(&self, key: &str, field: &str, by: i64) -> AppResult<i64> {
        let value = self.inner.decrement(key, field, by).await?;
        if self.stall_decrements.load(Ordering::SeqCst) {
            tokio::time::sleep(self.stall).await;
        }
        Ok(value)
    }

    async fn scan_keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        self.inner.scan_keys(prefix).await
    }

    async fn read_counters(&self, key: &str) -> AppResult<HashMap<String, i64>> {
        self.inner.read_counters(key).await
    }

    async fn try_acquire_lock(&self, key: &str, owner: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.try_acquire_lock(key, owner, ttl).await
    }

    async fn release_lock(&self, key: &str, owner: &str) -> AppResult<bool> {
        self.inner.release_lock(key, owner).await
    }
}

// ==================== Rates ====================

/// Rate source with one price for every (user, endpoint)
pub struct FixedRate(pub Option<EndpointRate>);

impl FixedRate {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn of(rate: Decimal, ratio: Decimal) -> Self {
        Self(Some(EndpointRate {
            product_id: 1,
            rate,
            ratio,
        }))
    }
}

#[async_trait]
impl RateSource for FixedRate {
    async fn find_endpoint_rate(
        &self,
        _user_id: i32,
        _endpoint_id: i32,
        _at: DateTime<Utc>,
    ) -> AppResult<Option<EndpointRate>> {
        Ok(self.0)
    }
}

/// Rate source that fails every lookup
pub struct FailingRate;

#[async_trait]
impl RateSource for FailingRate {
    async fn find_endpoint_rate(
        &self,
        _user_id: i32,
        _endpoint_id: i32,
        _at: DateTime<Utc>,
    ) -> AppResult<Option<EndpointRate>> {
        Err(AppError::Database("rates unavailable".to_string()))
    }
}

/// Rate source that meters extra calls while the drain is between its read
/// and its decrement
pub struct RacingRate {
    pub store: Arc<MemoryStore>,
    pub extra_calls: i64,
}

#[async_trait]
impl RateSource for RacingRate {
    async fn find_endpoint_rate(
        &self,
        user_id: i32,
        endpoint_id: i32,
        _at: DateTime<Utc>,
    ) -> AppResult<Option<EndpointRate>> {
        self.store
            .increment(
                &format!("epcalls:{}", user_id),
                &endpoint_id.to_string(),
                self.extra_calls,
            )
            .await?;
        Ok(None)
    }
}

// ==================== Config ====================

pub fn metering_config(policy: LedgerFailurePolicy) -> MeteringConfig {
    MeteringConfig {
        flush_interval_secs: 1,
        lock_ttl_secs: 5,
        cycle_timeout_secs: Some(5),
        ledger_failure_policy: policy,
        ..Default::default()
    }
}

/// Poll until a counter field reaches `expected` or a second passes
pub async fn wait_for_counter(store: &MemoryStore, key: &str, field: &str, expected: i64) -> bool {
    for _ in 0..100 {
        if store.counter(key, field) == Some(expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
