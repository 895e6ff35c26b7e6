//! Cache key constants and builders for RouteAPI
//!
//! Provides standardized key naming patterns for usage counters, the flush
//! lock and cached reference lookups, so every process agrees on the shared
//! key space.
//!
//! # Key Patterns
//!
//! - `epcalls:{user_id}` - Hash of per-endpoint call counters for a user
//! - `lock:epcalls_sync` - Cluster-wide flush lock
//! - `lerg6:{npanxx}` - Cached rate-center lookup
//! - `spidname:{spid}` - Cached service provider name
//! - `simplename:{carrier_spec_name}` - Cached simplified carrier name
//!
//! # Example
//!
//! ```
//! use routeapi_cache::keys;
//!
//! let key = keys::counter_key(keys::COUNTER_PREFIX, 42);
//! assert_eq!(key, "epcalls:42");
//! assert_eq!(keys::parse_counter_user(keys::COUNTER_PREFIX, &key), Some(42));
//! ```

use routeapi_core::config::{DEFAULT_COUNTER_PREFIX, DEFAULT_FLUSH_LOCK_KEY};

/// Prefix for usage counter hashes
///
/// Format: `epcalls:{user_id}`
pub const COUNTER_PREFIX: &str = DEFAULT_COUNTER_PREFIX;

/// Key of the cluster-wide flush lock
pub const FLUSH_LOCK_KEY: &str = DEFAULT_FLUSH_LOCK_KEY;

/// Prefix for cached rate-center records
///
/// Format: `lerg6:{npanxx}`
pub const RATE_CENTER_PREFIX: &str = "lerg6";

/// Prefix for cached SPID names
///
/// Format: `spidname:{spid}`
pub const SPID_NAME_PREFIX: &str = "spidname";

/// Prefix for cached simplified carrier names
///
/// Format: `simplename:{carrier_spec_name}`
pub const SIMPLE_NAME_PREFIX: &str = "simplename";

/// Build the counter hash key for a user
///
/// # Example
///
/// ```
/// use routeapi_cache::keys::counter_key;
///
/// assert_eq!(counter_key("epcalls", 7), "epcalls:7");
/// ```
pub fn counter_key(prefix: &str, user_id: i32) -> String {
    format!("{}:{}", prefix, user_id)
}

/// Scan prefix matching every counter hash in a namespace
///
/// # Example
///
/// ```
/// use routeapi_cache::keys::counter_scan_prefix;
///
/// assert_eq!(counter_scan_prefix("epcalls"), "epcalls:");
/// ```
pub fn counter_scan_prefix(prefix: &str) -> String {
    format!("{}:", prefix)
}

/// Extract the user id from a counter hash key.
///
/// Returns `None` for keys outside the namespace or with a non-numeric id.
pub fn parse_counter_user(prefix: &str, key: &str) -> Option<i32> {
    key.strip_prefix(prefix)?.strip_prefix(':')?.parse().ok()
}

/// Hash field for an endpoint counter
pub fn endpoint_field(endpoint_id: i32) -> String {
    endpoint_id.to_string()
}

/// Build a cache key for a rate-center record by NPANXX
pub fn rate_center_key(npanxx: &str) -> String {
    format!("{}:{}", RATE_CENTER_PREFIX, npanxx)
}

/// Build a cache key for a SPID display name
pub fn spid_name_key(spid: &str) -> String {
    format!("{}:{}", SPID_NAME_PREFIX, spid)
}

/// Build a cache key for a simplified carrier name
pub fn simple_name_key(carrier_spec_name: &str) -> String {
    format!("{}:{}", SIMPLE_NAME_PREFIX, carrier_spec_name)
}

/// Build a glob pattern matching every key that starts with `prefix`
///
/// # Example
///
/// ```
/// use routeapi_cache::keys::pattern;
///
/// assert_eq!(pattern("epcalls:"), "epcalls:*");
/// ```
pub fn pattern(prefix: &str) -> String {
    format!("{}*", prefix)
}
