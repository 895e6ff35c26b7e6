//! Business logic services for RouteAPI
//!
//! This crate contains the services that answer number lookups and turn
//! them into billable usage.
//!
//! # Architecture
//!
//! Services are generic over the collaborator traits in routeapi-core so the
//! same code runs against PostgreSQL and Redis in production and against
//! in-memory stores in tests. `RouteCore` wires the production graph.
//!
//! # Services
//!
//! - `ResolutionEngine` - Jurisdiction, LRN and routing lookups
//! - `CachedReferenceReader` - Read-through cache for reference lookups
//! - `UsageMeter` - Per-call counter increments
//! - `FlushCoordinator` - Lock-guarded drain of counters into the ledger
//! - `MeteredLookup` - Metered, audited front end for the API layer

pub mod flush;
pub mod lookup;
pub mod metering;
pub mod reference_cache;
pub mod resolution;
pub mod runtime;

pub use flush::{CycleOutcome, FlushCoordinator, FlushStats, FlushStatsSnapshot};
pub use lookup::{MeteredLookup, BILLING_TARGET};
pub use metering::UsageMeter;
pub use reference_cache::CachedReferenceReader;
pub use resolution::ResolutionEngine;
pub use runtime::RouteCore;
