//! Telephony reference data repository
//!
//! Read-only access to the LERG-6 rate-center table, the directional `local`
//! agreement table, the per-NPA `tn2lrn{npa}` portability shards, the
//! `numberpoolblock` thousand-block table and the carrier name lookups.
//!
//! Every column is nullable in the loaded data; NULL reads back as an empty
//! string so resolution never has to distinguish the two.

use async_trait::async_trait;
use routeapi_core::{
    models::{LocalAgreement, NumberPoolBlock, PortabilityRecord, RateCenterRecord},
    number::NPA_LEN,
    traits::ReferenceDataReader,
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// Name of the portability shard holding numbers for an NPA.
///
/// Returns `None` unless `npa` is exactly three ASCII digits, which also
/// keeps the interpolated table name safe.
///
/// ```
/// use routeapi_db::portability_table;
///
/// assert_eq!(portability_table("216").as_deref(), Some("tn2lrn216"));
/// assert_eq!(portability_table("21"), None);
/// assert_eq!(portability_table("2x6"), None);
/// ```
pub fn portability_table(npa: &str) -> Option<String> {
    if npa.len() == NPA_LEN && npa.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("tn2lrn{}", npa))
    } else {
        None
    }
}

/// PostgreSQL implementation of ReferenceDataReader
pub struct PgReferenceRepository {
    pool: PgPool,
}

impl PgReferenceRepository {
    /// Create a new reference data repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Missing shard tables mean "no ported numbers in this NPA"
    fn is_undefined_table(err: &sqlx::Error) -> bool {
        matches!(
            err,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("42P01")
        )
    }
}

#[async_trait]
impl ReferenceDataReader for PgReferenceRepository {
    #[instrument(skip(self))]
    async fn find_rate_center(&self, npanxx: &str) -> AppResult<Option<RateCenterRecord>> {
        debug!("Finding rate center for NPANXX: {}", npanxx);

        let result = sqlx::query_as::<sqlx::Postgres, RateCenterRow>(
            r#"
            SELECT npanxxx, state, lata, rc, ocn, ocnname, category, co_spec_name
            FROM lerg6
            WHERE npanxxx = $1
            LIMIT 1
            "#,
        )
        .bind(npanxx)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding rate center {}: {}", npanxx, e);
            AppError::Database(format!("Failed to find rate center: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn has_local_agreement(&self, agreement: &LocalAgreement) -> AppResult<bool> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM local
                WHERE from_rc_abbrev = $1
                    AND from_state = $2
                    AND from_lata = $3
                    AND to_rc_abbrev = $4
                    AND to_state = $5
                    AND to_lata = $6
            )
            "#,
        )
        .bind(&agreement.from_rate_center)
        .bind(&agreement.from_state)
        .bind(&agreement.from_lata)
        .bind(&agreement.to_rate_center)
        .bind(&agreement.to_state)
        .bind(&agreement.to_lata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error checking local agreement: {}", e);
            AppError::Database(format!("Failed to check local agreement: {}", e))
        })?;

        Ok(exists.0)
    }

    #[instrument(skip(self))]
    async fn find_portability(&self, ten_digit: &str) -> AppResult<Option<PortabilityRecord>> {
        let npa = ten_digit.get(..NPA_LEN).unwrap_or(ten_digit);
        let Some(table) = portability_table(npa) else {
            debug!("No portability shard for input: {}", ten_digit);
            return Ok(None);
        };

        debug!("Finding portability record in {}", table);

        let query = format!(
            r#"
            SELECT tn, lrn, spid, altspid, activationtimestamp, lnptype, svtype,
                   alteult, alteulv, altbid, billingid, voiceuri, mmsuri, smsuri
            FROM {}
            WHERE tn = $1
            LIMIT 1
            "#,
            table
        );

        let result = sqlx::query_as::<sqlx::Postgres, PortabilityRow>(&query)
            .bind(ten_digit)
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(row.map(Into::into)),
            Err(e) if Self::is_undefined_table(&e) => {
                debug!("Portability shard {} does not exist", table);
                Ok(None)
            }
            Err(e) => {
                error!("Database error finding portability for {}: {}", ten_digit, e);
                Err(AppError::Database(format!(
                    "Failed to find portability record: {}",
                    e
                )))
            }
        }
    }

    #[instrument(skip(self))]
    async fn find_pool_block(&self, npanxxx: &str) -> AppResult<Option<NumberPoolBlock>> {
        debug!("Finding number pool block: {}", npanxxx);

        let result = sqlx::query_as::<sqlx::Postgres, PoolBlockRow>(
            r#"
            SELECT npanxxx, lrn, spid, altspid, activationtimestamp, blocksvtype,
                   alteult, alteulv, altbid, voiceuri, mmsuri, smsuri
            FROM numberpoolblock
            WHERE npanxxx = $1
            LIMIT 1
            "#,
        )
        .bind(npanxxx)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding pool block {}: {}", npanxxx, e);
            AppError::Database(format!("Failed to find pool block: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_spid_name(&self, spid: &str) -> AppResult<Option<String>> {
        let result: Option<(Option<String>,)> =
            sqlx::query_as("SELECT spidname FROM spidnames WHERE spid = $1 LIMIT 1")
                .bind(spid)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    error!("Database error finding SPID name {}: {}", spid, e);
                    AppError::Database(format!("Failed to find SPID name: {}", e))
                })?;

        Ok(result.and_then(|(name,)| name).filter(|n| !n.is_empty()))
    }

    #[instrument(skip(self))]
    async fn find_simplified_name(&self, carrier_spec_name: &str) -> AppResult<Option<String>> {
        let result: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT simplified_name FROM simple_carrier_names WHERE co_spec_name = $1 LIMIT 1",
        )
        .bind(carrier_spec_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding simplified name: {}", e);
            AppError::Database(format!("Failed to find simplified name: {}", e))
        })?;

        Ok(result.and_then(|(name,)| name).filter(|n| !n.is_empty()))
    }

    #[instrument(skip(self))]
    async fn find_nnmp(&self, carrier_spec_name: &str) -> AppResult<Option<i32>> {
        let result: Option<(Option<i32>,)> = sqlx::query_as(
            "SELECT nnmp FROM nnmp WHERE UPPER(co_spec_name) = UPPER($1) LIMIT 1",
        )
        .bind(carrier_spec_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding NNMP: {}", e);
            AppError::Database(format!("Failed to find NNMP: {}", e))
        })?;

        Ok(result.and_then(|(nnmp,)| nnmp))
    }
}

/// Helper struct for mapping lerg6 rows
#[derive(Debug, sqlx::FromRow)]
struct RateCenterRow {
    npanxxx: Option<String>,
    state: Option<String>,
    lata: Option<String>,
    rc: Option<String>,
    ocn: Option<String>,
    ocnname: Option<String>,
    category: Option<String>,
    co_spec_name: Option<String>,
}

impl From<RateCenterRow> for RateCenterRecord {
    fn from(row: RateCenterRow) -> Self {
        Self {
            npanxx: row.npanxxx.unwrap_or_default(),
            state: row.state.unwrap_or_default(),
            lata: row.lata.unwrap_or_default(),
            rate_center: row.rc.unwrap_or_default(),
            operating_company_number: row.ocn.unwrap_or_default(),
            operating_company_name: row.ocnname.unwrap_or_default(),
            category: row.category.unwrap_or_default(),
            carrier_spec_name: row.co_spec_name.unwrap_or_default(),
        }
    }
}

/// Helper struct for mapping tn2lrn shard rows
#[derive(Debug, sqlx::FromRow)]
struct PortabilityRow {
    tn: Option<String>,
    lrn: Option<String>,
    spid: Option<String>,
    altspid: Option<String>,
    activationtimestamp: Option<String>,
    lnptype: Option<String>,
    svtype: Option<String>,
    alteult: Option<String>,
    alteulv: Option<String>,
    altbid: Option<String>,
    billingid: Option<String>,
    voiceuri: Option<String>,
    mmsuri: Option<String>,
    smsuri: Option<String>,
}

impl From<PortabilityRow> for PortabilityRecord {
    fn from(row: PortabilityRow) -> Self {
        Self {
            tn: row.tn.unwrap_or_default(),
            routing_number: row.lrn.unwrap_or_default(),
            service_provider_id: row.spid.unwrap_or_default(),
            alt_service_provider_id: row.altspid.unwrap_or_default(),
            activation_timestamp: row.activationtimestamp.unwrap_or_default(),
            lnp_type: row.lnptype.unwrap_or_default(),
            service_type: row.svtype.unwrap_or_default(),
            alt_end_user_location_type: row.alteult.unwrap_or_default(),
            alt_end_user_location_value: row.alteulv.unwrap_or_default(),
            alt_billing_id: row.altbid.unwrap_or_default(),
            billing_id: row.billingid.unwrap_or_default(),
            voice_uri: row.voiceuri.unwrap_or_default(),
            mms_uri: row.mmsuri.unwrap_or_default(),
            sms_uri: row.smsuri.unwrap_or_default(),
        }
    }
}

/// Helper struct for mapping numberpoolblock rows
#[derive(Debug, sqlx::FromRow)]
struct PoolBlockRow {
    npanxxx: Option<String>,
    lrn: Option<String>,
    spid: Option<String>,
    altspid: Option<String>,
    activationtimestamp: Option<String>,
    blocksvtype: Option<String>,
    alteult: Option<String>,
    alteulv: Option<String>,
    altbid: Option<String>,
    voiceuri: Option<String>,
    mmsuri: Option<String>,
    smsuri: Option<String>,
}

impl From<PoolBlockRow> for NumberPoolBlock {
    fn from(row: PoolBlockRow) -> Self {
        Self {
            npanxxx: row.npanxxx.unwrap_or_default(),
            routing_number: row.lrn.unwrap_or_default(),
            service_provider_id: row.spid.unwrap_or_default(),
            alt_service_provider_id: row.altspid.unwrap_or_default(),
            activation_timestamp: row.activationtimestamp.unwrap_or_default(),
            block_service_type: row.blocksvtype.unwrap_or_default(),
            alt_end_user_location_type: row.alteult.unwrap_or_default(),
            alt_end_user_location_value: row.alteulv.unwrap_or_default(),
            alt_billing_id: row.altbid.unwrap_or_default(),
            voice_uri: row.voiceuri.unwrap_or_default(),
            mms_uri: row.mmsuri.unwrap_or_default(),
            sms_uri: row.smsuri.unwrap_or_default(),
        }
    }
}
