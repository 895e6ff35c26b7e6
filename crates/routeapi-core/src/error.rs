//! Unified error handling for RouteAPI
//!
//! Reference lookups never fail on a miss; absence is modeled as `None` and
//! mapped to empty values by the resolution engine. The variants below cover
//! the remaining failure scenarios: store outages, lock and ledger faults,
//! configuration and serialization problems.

use std::fmt;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    // ==================== Cache / Counter Store Errors ====================
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Cache connection failed: {0}")]
    CacheConnection(String),

    #[error("Counter store error: {0}")]
    CounterStore(String),

    // ==================== Metering Errors ====================
    #[error("Flush lock error: {0}")]
    Lock(String),

    #[error("Ledger write failed: {0}")]
    Ledger(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the error code used in logs and monitoring
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Cache(_) => "cache_error",
            AppError::CacheConnection(_) => "cache_connection_error",
            AppError::CounterStore(_) => "counter_store_error",
            AppError::Lock(_) => "lock_error",
            AppError::Ledger(_) => "ledger_error",
            AppError::Timeout(_) => "timeout",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the error means a backing store was unreachable or stalled.
    ///
    /// Transient errors on the metering path are logged and swallowed; on the
    /// drain path they abort the current cycle and the lock TTL heals it.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Pool(_)
                | AppError::Cache(_)
                | AppError::CacheConnection(_)
                | AppError::CounterStore(_)
                | AppError::Ledger(_)
                | AppError::Timeout(_)
        )
    }
}

/// Compact severity label for structured log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Transient => write!(f, "transient"),
            ErrorClass::Permanent => write!(f, "permanent"),
        }
    }
}

impl From<&AppError> for ErrorClass {
    fn from(err: &AppError) -> Self {
        if err.is_transient() {
            ErrorClass::Transient
        } else {
            ErrorClass::Permanent
        }
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
