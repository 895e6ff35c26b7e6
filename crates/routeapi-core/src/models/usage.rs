//! Usage metering models
//!
//! Calls are counted per (user, endpoint) in the shared counter store and
//! drained periodically into an append-only ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Accumulated call count for one (user, endpoint) pair since the last drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub user_id: i32,
    pub endpoint_id: i32,
    pub count: i64,
}

/// Durable billing fact written once per drained counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLedgerEntry {
    /// When the drain observed the count
    pub recorded_at: DateTime<Utc>,
    pub user_id: i32,
    pub endpoint_id: i32,
    /// Calls covered by this entry
    pub count: i64,
    /// Billed amount (`count × unit price`)
    pub amount: Decimal,
}

impl UsageLedgerEntry {
    /// Build a ledger entry for a drained counter
    pub fn new(counter: UsageCounter, unit_price: Option<Decimal>, recorded_at: DateTime<Utc>) -> Self {
        let amount = unit_price
            .map(|price| price * Decimal::from(counter.count))
            .unwrap_or(Decimal::ZERO);

        Self {
            recorded_at,
            user_id: counter.user_id,
            endpoint_id: counter.endpoint_id,
            count: counter.count,
            amount,
        }
    }
}

/// Effective price of one call for a user on an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRate {
    pub product_id: i32,
    /// Product list rate per call
    pub rate: Decimal,
    /// Per-user multiplier from the user's product settings
    pub ratio: Decimal,
}

impl EndpointRate {
    /// Price charged per call
    pub fn unit_price(&self) -> Decimal {
        self.rate * self.ratio
    }
}

/// Summed ledger rows for one (user, endpoint) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub count: i64,
    pub amount: Decimal,
}

/// Who is making a metered lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub user_id: i32,
    pub endpoint_id: i32,
    /// Endpoint name used in the billing audit line
    pub endpoint: String,
    /// Client address used in the billing audit line
    pub ip_address: String,
}
