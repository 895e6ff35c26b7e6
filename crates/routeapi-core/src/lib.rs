//! RouteAPI Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the RouteAPI system. It includes:
//!
//! - Reference-data models (rate centers, portability records, pool blocks)
//! - Usage metering models (counters, ledger entries)
//! - Telephone number normalization
//! - Collaborator traits for reference data, counter store and ledger sink
//! - Unified error handling
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod number;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
