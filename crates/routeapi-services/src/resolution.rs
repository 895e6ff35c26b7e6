//! Resolution engine
//!
//! Answers the two questions the API exists for: how a call between two
//! numbers is classified, and where a number actually routes. Missing
//! reference data never fails a lookup; it produces `Unknown` or empty
//! fields. Only a failing reference store surfaces as an error.

use routeapi_core::{
    models::{Jurisdiction, PortabilityInfo, RateCenterRecord, RoutingInfo},
    number::{self, NormalizedNumber},
    traits::ReferenceDataReader,
    AppResult,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Jurisdiction and routing lookups over a reference data reader
pub struct ResolutionEngine<R: ReferenceDataReader> {
    reader: Arc<R>,
}

impl<R: ReferenceDataReader> Clone for ResolutionEngine<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
        }
    }
}

impl<R: ReferenceDataReader> ResolutionEngine<R> {
    /// Create a new resolution engine
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    /// Classify a call from `origin` to `destination`.
    ///
    /// Checks run in a fixed order: a miss on either side is `Unknown`, an
    /// identical rating point is `Local`, then an explicit agreement from
    /// origin to destination is `Local`, and only then does the state decide
    /// between `Intrastate` and `Interstate`.
    #[instrument(skip(self))]
    pub async fn jurisdiction(&self, origin: &str, destination: &str) -> AppResult<Jurisdiction> {
        let Some(from) = self.reader.find_rate_center(number::npanxx(origin)).await? else {
            debug!("No rate center for origin {}", origin);
            return Ok(Jurisdiction::Unknown);
        };
        let Some(to) = self.reader.find_rate_center(number::npanxx(destination)).await? else {
            debug!("No rate center for destination {}", destination);
            return Ok(Jurisdiction::Unknown);
        };

        self.classify(&from, &to).await
    }

    async fn classify(
        &self,
        from: &RateCenterRecord,
        to: &RateCenterRecord,
    ) -> AppResult<Jurisdiction> {
        if from.same_rating_point(to) {
            return Ok(Jurisdiction::Local);
        }

        if self.reader.has_local_agreement(&from.agreement_to(to)).await? {
            debug!(
                "Local agreement {} -> {} overrides LATA/state",
                from.rate_center, to.rate_center
            );
            return Ok(Jurisdiction::Local);
        }

        if from.state == to.state {
            Ok(Jurisdiction::Intrastate)
        } else {
            Ok(Jurisdiction::Interstate)
        }
    }

    /// Full portability record for a number.
    ///
    /// The per-TN record wins; otherwise the thousand-block record is used
    /// and reported with LNP type `pool`.
    #[instrument(skip(self))]
    pub async fn lookup_portability(&self, tn: &str) -> AppResult<Option<PortabilityInfo>> {
        let number = NormalizedNumber::parse(tn);

        if let Some(record) = self.reader.find_portability(&number.ten_digit).await? {
            return Ok(Some(PortabilityInfo::from_record(tn, record)));
        }

        let block = self.reader.find_pool_block(number.npanxxx()).await?;
        if block.is_some() {
            debug!("Answering {} from number pool block", tn);
        }
        Ok(block.map(|b| PortabilityInfo::from_pool_block(tn, b)))
    }

    /// Routing number for a number, with the caller's prefix restored.
    ///
    /// Empty when the number is neither ported nor in a pooled block.
    #[instrument(skip(self))]
    pub async fn lrn(&self, tn: &str) -> AppResult<String> {
        let prefix = NormalizedNumber::parse(tn).prefix;
        let info = self.lookup_portability(tn).await?;

        Ok(info
            .map(|i| prefix.restore(&i.routing_number))
            .unwrap_or_default())
    }

    /// Merged routing answer for a number.
    #[instrument(skip(self))]
    pub async fn resolve_routing(&self, tn: &str) -> AppResult<RoutingInfo> {
        let number = NormalizedNumber::parse(tn);
        let mut info = RoutingInfo::empty(tn);

        // The LRN names the serving switch; rate it instead of the dialed NPANXX
        let mut npanxx = number.npanxx().to_string();
        if let Some(port) = self.lookup_portability(tn).await? {
            if !port.routing_number.is_empty() {
                npanxx = number::npanxx(&port.routing_number).to_string();
            }
            info.routing_number = number.prefix.restore(&port.routing_number);
            info.service_provider_id = port.service_provider_id;
            info.ported_date = port.activation_timestamp;
            info.lnp_type = port.lnp_type;
        }

        if let Some(rc) = self.reader.find_rate_center(&npanxx).await? {
            info.operating_company_number = rc.operating_company_number;
            info.operating_company_name = rc.operating_company_name;
            info.category = rc.category;
            info.carrier_spec_name = rc.carrier_spec_name;
        }

        if !info.service_provider_id.is_empty() {
            info.service_provider_name = self
                .reader
                .find_spid_name(&info.service_provider_id)
                .await?
                .unwrap_or_default();
        }

        if !info.carrier_spec_name.is_empty() {
            info.simplified_name = self
                .reader
                .find_simplified_name(&info.carrier_spec_name)
                .await?
                .unwrap_or_default();
        }

        info.display_name =
            RoutingInfo::carrier_label(&info.carrier_spec_name, &info.operating_company_name);

        Ok(info)
    }

    /// Classify a call from `calling` to the switch that serves `tn`.
    ///
    /// Uses the LRN of `tn` when it has one, the dialed number otherwise.
    #[instrument(skip(self))]
    pub async fn lrn_jurisdiction(&self, tn: &str, calling: &str) -> AppResult<Jurisdiction> {
        let routed = match self.lookup_portability(tn).await? {
            Some(port) if !port.routing_number.is_empty() => port.routing_number,
            _ => tn.to_string(),
        };

        self.jurisdiction(calling, &routed).await
    }

    /// National numbering plan code of the carrier serving `tn`, 0 if unknown
    #[instrument(skip(self))]
    pub async fn nnmp(&self, tn: &str) -> AppResult<i32> {
        let routing = self.resolve_routing(tn).await?;
        if routing.carrier_spec_name.is_empty() {
            return Ok(0);
        }

        Ok(self
            .reader
            .find_nnmp(&routing.carrier_spec_name)
            .await?
            .unwrap_or(0))
    }
}
