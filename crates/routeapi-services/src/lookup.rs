//! Metered lookups
//!
//! The entry point the API layer calls on behalf of an authenticated caller.
//! Every lookup is metered before it runs and leaves one audit event on the
//! `billing` target once it has an answer.

use routeapi_core::{
    models::{CallerContext, Jurisdiction, PortabilityInfo, RoutingInfo},
    traits::{CounterStore, ReferenceDataReader},
    AppResult,
};
use std::fmt::Display;
use tracing::{info, instrument, warn};

use crate::metering::UsageMeter;
use crate::resolution::ResolutionEngine;

/// Log target of the per-call billing audit events
pub const BILLING_TARGET: &str = "billing";

/// Resolution engine front end that meters and audits every call
pub struct MeteredLookup<R: ReferenceDataReader, S: CounterStore> {
    engine: ResolutionEngine<R>,
    meter: UsageMeter<S>,
}

impl<R, S> MeteredLookup<R, S>
where
    R: ReferenceDataReader,
    S: CounterStore + 'static,
{
    pub fn new(engine: ResolutionEngine<R>, meter: UsageMeter<S>) -> Self {
        Self { engine, meter }
    }

    /// Unmetered access for internal callers
    pub fn engine(&self) -> &ResolutionEngine<R> {
        &self.engine
    }

    #[instrument(skip(self, ctx), fields(uid = ctx.user_id))]
    pub async fn jurisdiction(
        &self,
        ctx: &CallerContext,
        origin: &str,
        destination: &str,
    ) -> AppResult<Jurisdiction> {
        self.meter.meter(ctx.user_id, ctx.endpoint_id);
        let result = self.engine.jurisdiction(origin, destination).await;
        audit(ctx, &result, origin, destination);
        result
    }

    #[instrument(skip(self, ctx), fields(uid = ctx.user_id))]
    pub async fn lrn(&self, ctx: &CallerContext, tn: &str) -> AppResult<String> {
        self.meter.meter(ctx.user_id, ctx.endpoint_id);
        let result = self.engine.lrn(tn).await;
        audit(ctx, &result, "", tn);
        result
    }

    #[instrument(skip(self, ctx), fields(uid = ctx.user_id))]
    pub async fn resolve_routing(&self, ctx: &CallerContext, tn: &str) -> AppResult<RoutingInfo> {
        self.meter.meter(ctx.user_id, ctx.endpoint_id);
        let result = self.engine.resolve_routing(tn).await;
        audit(ctx, &result.as_ref().map(as_json), "", tn);
        result
    }

    #[instrument(skip(self, ctx), fields(uid = ctx.user_id))]
    pub async fn lookup_portability(
        &self,
        ctx: &CallerContext,
        tn: &str,
    ) -> AppResult<Option<PortabilityInfo>> {
        self.meter.meter(ctx.user_id, ctx.endpoint_id);
        let result = self.engine.lookup_portability(tn).await;
        let logged = result
            .as_ref()
            .map(|info| info.as_ref().map(as_json).unwrap_or_default());
        audit(ctx, &logged, "", tn);
        result
    }

    #[instrument(skip(self, ctx), fields(uid = ctx.user_id))]
    pub async fn lrn_jurisdiction(
        &self,
        ctx: &CallerContext,
        tn: &str,
        calling: &str,
    ) -> AppResult<Jurisdiction> {
        self.meter.meter(ctx.user_id, ctx.endpoint_id);
        let result = self.engine.lrn_jurisdiction(tn, calling).await;
        audit(ctx, &result, calling, tn);
        result
    }

    #[instrument(skip(self, ctx), fields(uid = ctx.user_id))]
    pub async fn nnmp(&self, ctx: &CallerContext, tn: &str) -> AppResult<i32> {
        self.meter.meter(ctx.user_id, ctx.endpoint_id);
        let result = self.engine.nnmp(tn).await;
        audit(ctx, &result, "", tn);
        result
    }
}

fn as_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Emit the billing audit event for a finished lookup
fn audit<T: Display, E: Display>(ctx: &CallerContext, result: &Result<T, E>, dn: &str, tn: &str) {
    match result {
        Ok(value) => info!(
            target: BILLING_TARGET,
            ip = %ctx.ip_address,
            uid = ctx.user_id,
            endpoint = %ctx.endpoint,
            result = %value,
            dn,
            tn,
            "BILL"
        ),
        Err(e) => warn!(
            target: BILLING_TARGET,
            ip = %ctx.ip_address,
            uid = ctx.user_id,
            endpoint = %ctx.endpoint,
            dn,
            tn,
            "Lookup failed: {}", e
        ),
    }
}
