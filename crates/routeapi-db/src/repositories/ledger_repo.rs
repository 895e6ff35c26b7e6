//! Usage ledger repository implementation
//!
//! Appends drained usage to `endpoint_stats`. Rows are never updated or
//! deleted; statements and reconciliation sum them.

use async_trait::async_trait;
use routeapi_core::{
    models::{LedgerTotals, UsageLedgerEntry},
    traits::LedgerSink,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of LedgerSink
pub struct PgLedgerRepository {
    pool: PgPool,
}

impl PgLedgerRepository {
    /// Create a new ledger repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerSink for PgLedgerRepository {
    #[instrument(skip(self, entry), fields(user_id = entry.user_id, endpoint_id = entry.endpoint_id))]
    async fn append(&self, entry: &UsageLedgerEntry) -> AppResult<()> {
        debug!("Appending {} calls to ledger", entry.count);

        sqlx::query(
            r#"
            INSERT INTO endpoint_stats (calldate, userid, endpointid, count, amount)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.recorded_at)
        .bind(entry.user_id)
        .bind(entry.endpoint_id)
        .bind(entry.count)
        .bind(entry.amount)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error appending ledger row for user {} endpoint {}: {}",
                entry.user_id, entry.endpoint_id, e
            );
            AppError::Ledger(format!("Failed to insert ledger row: {}", e))
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn totals(&self, user_id: i32, endpoint_id: i32) -> AppResult<LedgerTotals> {
        let (count, amount): (Option<i64>, Option<Decimal>) = sqlx::query_as(
            r#"
            SELECT SUM(count)::BIGINT, SUM(amount)
            FROM endpoint_stats
            WHERE userid = $1 AND endpointid = $2
            "#,
        )
        .bind(user_id)
        .bind(endpoint_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error summing ledger rows: {}", e);
            AppError::Database(format!("Failed to sum ledger rows: {}", e))
        })?;

        Ok(LedgerTotals {
            count: count.unwrap_or(0),
            amount: amount.unwrap_or(Decimal::ZERO),
        })
    }
}
