//! Distributed flush coordinator
//!
//! Every process runs one coordinator. On each tick it tries to take the
//! cluster-wide flush lock; the one process that wins drains every usage
//! counter into the ledger and releases the lock. The others skip the tick.
//!
//! A drain subtracts exactly the value it read rather than resetting the
//! counter, so calls metered while the drain runs stay in the store for the
//! next cycle. Counter decrement and ledger insert are two separate stores
//! with no shared transaction: a process dying between them loses that one
//! batch. A ledger write that fails cleanly is handled by the configured
//! `LedgerFailurePolicy`, and every lost count is reported in `FlushStats`.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use routeapi_cache::keys;
use routeapi_core::{
    config::{LedgerFailurePolicy, MeteringConfig},
    error::ErrorClass,
    models::{UsageCounter, UsageLedgerEntry},
    traits::{CounterStore, LedgerSink, RateSource},
    AppResult,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Result of one coordinator tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another process holds the lock, or it could not be taken
    Skipped,
    /// Every counter was drained
    Completed { entries: u64, counts: i64 },
    /// A store error aborted the drain
    Failed,
    /// The drain ran past the cycle timeout
    TimedOut,
}

/// Process-local flush counters
#[derive(Debug, Default)]
pub struct FlushStats {
    cycles_started: AtomicU64,
    cycles_skipped: AtomicU64,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    cycles_timed_out: AtomicU64,
    entries_written: AtomicU64,
    counts_written: AtomicU64,
    counts_restored: AtomicU64,
    counts_lost: AtomicU64,
    cycles_with_lost_counts: AtomicU64,
    counts_at_risk: AtomicU64,
}

/// Point-in-time copy of `FlushStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushStatsSnapshot {
    pub cycles_started: u64,
    pub cycles_skipped: u64,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub cycles_timed_out: u64,
    pub entries_written: u64,
    pub counts_written: u64,
    pub counts_restored: u64,
    /// Calls decremented from the store with no ledger row behind them
    pub counts_lost: u64,
    pub cycles_with_lost_counts: u64,
    /// Calls whose decrement was sent but never confirmed before a timeout;
    /// they may be in the store or gone without a ledger row
    pub counts_at_risk: u64,
}

impl FlushStats {
    pub fn snapshot(&self) -> FlushStatsSnapshot {
        FlushStatsSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            cycles_timed_out: self.cycles_timed_out.load(Ordering::Relaxed),
            entries_written: self.entries_written.load(Ordering::Relaxed),
            counts_written: self.counts_written.load(Ordering::Relaxed),
            counts_restored: self.counts_restored.load(Ordering::Relaxed),
            counts_lost: self.counts_lost.load(Ordering::Relaxed),
            cycles_with_lost_counts: self.cycles_with_lost_counts.load(Ordering::Relaxed),
            counts_at_risk: self.counts_at_risk.load(Ordering::Relaxed),
        }
    }

    fn add(counter: &AtomicU64, n: i64) {
        counter.fetch_add(u64::try_from(n).unwrap_or(0), Ordering::Relaxed);
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Counter between its decrement and its ledger write
#[derive(Debug, Clone)]
struct InFlight {
    key: String,
    field: String,
    count: i64,
    /// The store acknowledged the decrement
    decremented: bool,
}

#[derive(Debug, Default)]
struct DrainSummary {
    entries: u64,
    counts: i64,
}

/// Per-process owner token for the flush lock: `{hostname}-{uuid}`
pub fn owner_token() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    format!("{}-{}", host, Uuid::new_v4())
}

/// Drains usage counters into the ledger under a cluster-wide lock
pub struct FlushCoordinator<S, L, Rt> {
    store: Arc<S>,
    ledger: Arc<L>,
    rates: Arc<Rt>,
    config: MeteringConfig,
    owner: String,
    stats: FlushStats,
    in_flight: Mutex<Option<InFlight>>,
}

impl<S, L, Rt> FlushCoordinator<S, L, Rt>
where
    S: CounterStore + 'static,
    L: LedgerSink + 'static,
    Rt: RateSource + 'static,
{
    /// Create a coordinator with a fresh owner token
    pub fn new(store: Arc<S>, ledger: Arc<L>, rates: Arc<Rt>, config: MeteringConfig) -> Self {
        Self {
            store,
            ledger,
            rates,
            config,
            owner: owner_token(),
            stats: FlushStats::default(),
            in_flight: Mutex::new(None),
        }
    }

    /// Replace the owner token
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Token written into the flush lock while this coordinator holds it
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn stats(&self) -> FlushStatsSnapshot {
        self.stats.snapshot()
    }

    /// Run the coordinator every `flush_interval` until `shutdown` fires.
    ///
    /// The first cycle runs one full interval after start.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.flush_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; consume that tick
            ticker.tick().await;

            info!(
                owner = %self.owner,
                interval_secs = self.config.flush_interval_secs,
                "Flush coordinator started"
            );

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!(owner = %self.owner, "Flush coordinator stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.run_cycle().await;
                    }
                }
            }
        })
    }

    /// One tick: acquire the lock, drain, release.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn run_cycle(&self) -> CycleOutcome {
        let lock_key = &self.config.lock_key;

        match self
            .store
            .try_acquire_lock(lock_key, &self.owner, self.config.lock_ttl())
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!("Flush lock {} held elsewhere, skipping", lock_key);
                FlushStats::bump(&self.stats.cycles_skipped);
                return CycleOutcome::Skipped;
            }
            Err(e) => {
                warn!(
                    error_code = e.error_code(),
                    class = %ErrorClass::from(&e),
                    "Could not acquire flush lock {}: {}", lock_key, e
                );
                FlushStats::bump(&self.stats.cycles_skipped);
                return CycleOutcome::Skipped;
            }
        }

        FlushStats::bump(&self.stats.cycles_started);

        let outcome = match tokio::time::timeout(self.config.cycle_timeout(), self.drain()).await {
            Ok(Ok(summary)) => {
                FlushStats::bump(&self.stats.cycles_completed);
                if summary.entries > 0 {
                    info!(
                        entries = summary.entries,
                        counts = summary.counts,
                        "Flushed usage counters to ledger"
                    );
                } else {
                    debug!("No usage counters to flush");
                }
                CycleOutcome::Completed {
                    entries: summary.entries,
                    counts: summary.counts,
                }
            }
            Ok(Err(e)) => {
                error!(
                    error_code = e.error_code(),
                    class = %ErrorClass::from(&e),
                    "Flush cycle aborted: {}", e
                );
                FlushStats::bump(&self.stats.cycles_failed);
                CycleOutcome::Failed
            }
            Err(_) => {
                error!(
                    timeout_secs = self.config.cycle_timeout().as_secs(),
                    "Flush cycle timed out"
                );
                let pending = self.in_flight.lock().take();
                match pending {
                    Some(pending) if pending.decremented => {
                        self.handle_ledger_failure(&pending).await;
                    }
                    Some(pending) => self.record_at_risk(&pending),
                    None => {}
                }
                FlushStats::bump(&self.stats.cycles_timed_out);
                CycleOutcome::TimedOut
            }
        };

        self.release_lock().await;
        outcome
    }

    async fn release_lock(&self) {
        let lock_key = &self.config.lock_key;
        match self.store.release_lock(lock_key, &self.owner).await {
            Ok(true) => debug!("Released flush lock {}", lock_key),
            Ok(false) => warn!(
                "Flush lock {} expired before release; another process may hold it",
                lock_key
            ),
            Err(e) => warn!(
                "Failed to release flush lock {}, it expires in {}s: {}",
                lock_key, self.config.lock_ttl_secs, e
            ),
        }
    }

    async fn drain(&self) -> AppResult<DrainSummary> {
        let prefix = &self.config.counter_prefix;
        let counter_keys = self
            .store
            .scan_keys(&keys::counter_scan_prefix(prefix))
            .await?;
        let recorded_at = Utc::now();
        let mut summary = DrainSummary::default();

        for key in counter_keys {
            let Some(user_id) = keys::parse_counter_user(prefix, &key) else {
                warn!("Skipping counter key with no user id: {}", key);
                continue;
            };

            let fields = self.store.read_counters(&key).await?;
            for (field, count) in fields {
                if count <= 0 {
                    continue;
                }
                let Ok(endpoint_id) = field.parse::<i32>() else {
                    warn!("Skipping non-numeric endpoint field {} in {}", field, key);
                    continue;
                };

                let counter = UsageCounter {
                    user_id,
                    endpoint_id,
                    count,
                };
                self.drain_counter(&key, &field, counter, recorded_at).await?;

                summary.entries += 1;
                summary.counts += count;
            }
        }

        Ok(summary)
    }

    /// Price, decrement and record one counter.
    async fn drain_counter(
        &self,
        key: &str,
        field: &str,
        counter: UsageCounter,
        recorded_at: DateTime<Utc>,
    ) -> AppResult<()> {
        // Price first so a rate lookup failure leaves the counter untouched
        let unit_price = self
            .rates
            .find_endpoint_rate(counter.user_id, counter.endpoint_id, recorded_at)
            .await?
            .map(|rate| rate.unit_price());

        // Marked before the call: a timeout may land after the store applied it
        let mut pending = InFlight {
            key: key.to_string(),
            field: field.to_string(),
            count: counter.count,
            decremented: false,
        };
        *self.in_flight.lock() = Some(pending.clone());

        if let Err(e) = self.store.decrement(key, field, counter.count).await {
            self.in_flight.lock().take();
            return Err(e);
        }
        pending.decremented = true;
        *self.in_flight.lock() = Some(pending.clone());

        let entry = UsageLedgerEntry::new(counter, unit_price, recorded_at);
        let result = self.ledger.append(&entry).await;
        self.in_flight.lock().take();

        match result {
            Ok(()) => {
                FlushStats::bump(&self.stats.entries_written);
                FlushStats::add(&self.stats.counts_written, counter.count);
                Ok(())
            }
            Err(e) => {
                self.handle_ledger_failure(&pending).await;
                Err(e)
            }
        }
    }

    async fn handle_ledger_failure(&self, pending: &InFlight) {
        match self.config.ledger_failure_policy {
            LedgerFailurePolicy::Restore => {
                let restore = tokio::time::timeout(
                    self.config.restore_timeout(),
                    self.store
                        .increment(&pending.key, &pending.field, pending.count),
                )
                .await;

                match restore {
                    Ok(Ok(_)) => {
                        warn!(
                            "Restored {} calls to {} field {} after ledger failure",
                            pending.count, pending.key, pending.field
                        );
                        FlushStats::add(&self.stats.counts_restored, pending.count);
                    }
                    Ok(Err(e)) => {
                        error!(
                            "Lost {} calls from {} field {}: restore failed: {}",
                            pending.count, pending.key, pending.field, e
                        );
                        self.record_loss(pending.count);
                    }
                    Err(_) => {
                        error!(
                            "Lost {} calls from {} field {}: restore timed out after {}s",
                            pending.count,
                            pending.key,
                            pending.field,
                            self.config.restore_timeout_secs
                        );
                        self.record_loss(pending.count);
                    }
                }
            }
            LedgerFailurePolicy::Drop => {
                error!(
                    "Dropped {} calls from {} field {} after ledger failure",
                    pending.count, pending.key, pending.field
                );
                self.record_loss(pending.count);
            }
        }
    }

    /// A decrement was sent but the cycle timed out before the store answered.
    /// Restoring could double bill if it never applied, so only report it.
    fn record_at_risk(&self, pending: &InFlight) {
        error!(
            "{} calls from {} field {} at risk: decrement unconfirmed at timeout",
            pending.count, pending.key, pending.field
        );
        FlushStats::add(&self.stats.counts_at_risk, pending.count);
    }

    fn record_loss(&self, count: i64) {
        FlushStats::add(&self.stats.counts_lost, count);
        FlushStats::bump(&self.stats.cycles_with_lost_counts);
    }
}
