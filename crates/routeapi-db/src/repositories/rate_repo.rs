//! Endpoint rate repository implementation
//!
//! A user's price for an endpoint comes from the highest-priority product
//! the user is enrolled in that carries a rate for that endpoint. Both the
//! enrollment and the rate must be effective at the lookup time; a NULL
//! bound is open-ended.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use routeapi_core::{models::EndpointRate, traits::RateSource, AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of RateSource
pub struct PgEndpointRateRepository {
    pool: PgPool,
}

impl PgEndpointRateRepository {
    /// Create a new endpoint rate repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateSource for PgEndpointRateRepository {
    #[instrument(skip(self))]
    async fn find_endpoint_rate(
        &self,
        user_id: i32,
        endpoint_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Option<EndpointRate>> {
        let result = sqlx::query_as::<sqlx::Postgres, EndpointRateRow>(
            r#"
            SELECT us.productid, r.rate, us.ratio
            FROM user_settings us
            JOIN rates r ON r.productid = us.productid
            WHERE us.userid = $1
                AND r.endpointid = $2
                AND (us.dateeff IS NULL OR us.dateeff <= $3)
                AND (us.dateexp IS NULL OR us.dateexp > $3)
                AND (r.dateeff IS NULL OR r.dateeff <= $3)
                AND (r.dateexp IS NULL OR r.dateexp > $3)
            ORDER BY us.productpriority DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(endpoint_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error finding rate for user {} endpoint {}: {}",
                user_id, endpoint_id, e
            );
            AppError::Database(format!("Failed to find endpoint rate: {}", e))
        })?;

        if result.is_none() {
            debug!("No active rate for user {} endpoint {}", user_id, endpoint_id);
        }

        Ok(result.map(Into::into))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct EndpointRateRow {
    productid: i32,
    rate: Option<Decimal>,
    ratio: Option<Decimal>,
}

impl From<EndpointRateRow> for EndpointRate {
    fn from(row: EndpointRateRow) -> Self {
        Self {
            product_id: row.productid,
            rate: row.rate.unwrap_or(Decimal::ZERO),
            ratio: row.ratio.unwrap_or(Decimal::ONE),
        }
    }
}
