//! RouteAPI Database Layer
//!
//! This crate provides PostgreSQL access for the RouteAPI system. It includes:
//!
//! - Connection pool management with sqlx
//! - The read-only telephony reference tables (LERG-6, local agreements,
//!   per-NPA portability shards, number pool blocks, carrier name lookups)
//! - User product rates used to price drained usage
//! - The append-only `endpoint_stats` usage ledger

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use routeapi_core::{AppError, AppResult};
pub use sqlx::PgPool;
