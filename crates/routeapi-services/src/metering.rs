//! Usage meter
//!
//! Counts one call per (user, endpoint) in the shared counter store with a
//! single `HINCRBY`. Metering is auxiliary to serving a lookup: store
//! failures are logged and swallowed, never returned to the request path.

use routeapi_cache::keys;
use routeapi_core::traits::CounterStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Counter-store backed call meter
pub struct UsageMeter<S: CounterStore> {
    store: Arc<S>,
    prefix: String,
}

impl<S: CounterStore> Clone for UsageMeter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: self.prefix.clone(),
        }
    }
}

impl<S: CounterStore + 'static> UsageMeter<S> {
    /// Create a meter writing under the `prefix` counter namespace
    pub fn new(store: Arc<S>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Count one call and wait for the store.
    ///
    /// Returns `false` when the increment could not be recorded; the failure
    /// has already been logged.
    pub async fn record(&self, user_id: i32, endpoint_id: i32) -> bool {
        let key = keys::counter_key(&self.prefix, user_id);
        let field = keys::endpoint_field(endpoint_id);

        match self.store.increment(&key, &field, 1).await {
            Ok(count) => {
                debug!("Metered user {} endpoint {} (pending {})", user_id, endpoint_id, count);
                true
            }
            Err(e) => {
                warn!(
                    error_code = e.error_code(),
                    "Failed to meter call for user {} endpoint {}: {}", user_id, endpoint_id, e
                );
                false
            }
        }
    }

    /// Count one call without waiting.
    ///
    /// The increment runs on its own task; the handle may be dropped.
    pub fn meter(&self, user_id: i32, endpoint_id: i32) -> JoinHandle<bool> {
        let meter = self.clone();
        tokio::spawn(async move { meter.record(user_id, endpoint_id).await })
    }
}
