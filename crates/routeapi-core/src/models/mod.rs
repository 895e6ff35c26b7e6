//! Domain models for RouteAPI
//!
//! Reference-data records are read-only here; they are loaded by an external
//! bulk process. Usage models describe the metering counters and the durable
//! ledger they drain into.

pub mod portability;
pub mod rate_center;
pub mod routing;
pub mod usage;

pub use portability::{NumberPoolBlock, PortabilityInfo, PortabilityRecord, POOL_LNP_TYPE};
pub use rate_center::{LocalAgreement, RateCenterRecord};
pub use routing::{Jurisdiction, RoutingInfo, USE_VARIES_BY_COMPANY};
pub use usage::{CallerContext, EndpointRate, LedgerTotals, UsageCounter, UsageLedgerEntry};
