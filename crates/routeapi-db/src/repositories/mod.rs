//! Repository implementations
//!
//! Concrete implementations of the collaborator traits defined in
//! routeapi-core, using sqlx for PostgreSQL access.

pub mod ledger_repo;
pub mod rate_repo;
pub mod reference_repo;

pub use ledger_repo::PgLedgerRepository;
pub use rate_repo::PgEndpointRateRepository;
pub use reference_repo::{portability_table, PgReferenceRepository};
