//! Jurisdiction and routing resolution against in-memory reference data

mod common;

use common::*;
use routeapi_cache::{keys, MemoryStore};
use routeapi_core::models::{
    CallerContext, Jurisdiction, NumberPoolBlock, PortabilityRecord, RateCenterRecord,
    USE_VARIES_BY_COMPANY,
};
use routeapi_services::{MeteredLookup, ResolutionEngine, UsageMeter};
use std::sync::Arc;

fn engine(reference: InMemoryReference) -> ResolutionEngine<InMemoryReference> {
    ResolutionEngine::new(Arc::new(reference))
}

fn cleveland_akron(akron: RateCenterRecord) -> InMemoryReference {
    InMemoryReference::new()
        .with_rate_center(rate_center("216401", "OH", "320", "CLEVELAND"))
        .with_rate_center(akron)
}

// ==================== Jurisdiction ====================

#[tokio::test]
async fn test_same_rating_point_is_local() {
    let engine = engine(cleveland_akron(rate_center("330405", "OH", "320", "CLEVELAND")));

    let result = engine.jurisdiction("2164015555", "3304051234").await.unwrap();
    assert_eq!(result, Jurisdiction::Local);
}

#[tokio::test]
async fn test_same_state_different_lata_is_intrastate() {
    let engine = engine(cleveland_akron(rate_center("330405", "OH", "324", "AKRON")));

    let result = engine.jurisdiction("2164015555", "3304051234").await.unwrap();
    assert_eq!(result, Jurisdiction::Intrastate);
}

#[tokio::test]
async fn test_different_state_is_interstate() {
    let engine = engine(cleveland_akron(rate_center("330405", "PA", "324", "SHARON")));

    let result = engine.jurisdiction("2164015555", "3304051234").await.unwrap();
    assert_eq!(result, Jurisdiction::Interstate);
}

#[tokio::test]
async fn test_local_agreement_overrides_lata_and_state() {
    let reference = cleveland_akron(rate_center("330405", "PA", "324", "SHARON"))
        .with_agreement("216401", "330405");
    let engine = engine(reference);

    assert_eq!(
        engine.jurisdiction("2164015555", "3304051234").await.unwrap(),
        Jurisdiction::Local
    );
    // Agreements are directional
    assert_eq!(
        engine.jurisdiction("3304051234", "2164015555").await.unwrap(),
        Jurisdiction::Interstate
    );
}

#[tokio::test]
async fn test_missing_rate_center_is_unknown() {
    let reference = cleveland_akron(rate_center("330405", "OH", "324", "AKRON"))
        .with_agreement("216401", "330405");
    let engine = engine(reference);

    assert_eq!(
        engine.jurisdiction("2164015555", "4405551234").await.unwrap(),
        Jurisdiction::Unknown
    );
    assert_eq!(
        engine.jurisdiction("4405551234", "2164015555").await.unwrap(),
        Jurisdiction::Unknown
    );
}

#[tokio::test]
async fn test_jurisdiction_accepts_prefixed_and_bare_npanxx() {
    let engine = engine(cleveland_akron(rate_center("330405", "OH", "324", "AKRON")));

    for (origin, dest) in [
        ("12164015555", "+13304051234"),
        ("216401", "330405"),
        ("+12164015555", "3304051234"),
    ] {
        assert_eq!(
            engine.jurisdiction(origin, dest).await.unwrap(),
            Jurisdiction::Intrastate,
            "{} -> {}",
            origin,
            dest
        );
    }
}

// ==================== Routing ====================

fn ported_reference() -> InMemoryReference {
    InMemoryReference::new()
        .with_rate_center(RateCenterRecord {
            npanxx: "216373".to_string(),
            state: "OH".to_string(),
            operating_company_number: "9325".to_string(),
            operating_company_name: "OHIO BELL TEL CO".to_string(),
            category: "ILEC".to_string(),
            carrier_spec_name: "AT&T OHIO".to_string(),
            ..Default::default()
        })
        .with_rate_center(RateCenterRecord {
            npanxx: "216990".to_string(),
            state: "OH".to_string(),
            operating_company_number: "6664".to_string(),
            operating_company_name: "SPRINT SPECTRUM L.P.".to_string(),
            category: "WIRELESS".to_string(),
            carrier_spec_name: "T-MOBILE".to_string(),
            ..Default::default()
        })
        .with_ported(PortabilityRecord {
            tn: "2163734606".to_string(),
            routing_number: "2169900000".to_string(),
            service_provider_id: "6529".to_string(),
            activation_timestamp: "2019-04-02T14:11:09".to_string(),
            lnp_type: "lspp".to_string(),
            billing_id: "0101".to_string(),
            ..Default::default()
        })
        .with_spid_name("6529", "T-MOBILE USA")
        .with_simplified_name("T-MOBILE", "T-Mobile")
        .with_nnmp("t-mobile", 310)
}

#[tokio::test]
async fn test_ported_number_rates_the_lrn_switch() {
    let engine = engine(ported_reference());

    let info = engine.resolve_routing("2163734606").await.unwrap();

    assert_eq!(info.tn, "2163734606");
    assert_eq!(info.routing_number, "2169900000");
    assert_eq!(info.service_provider_id, "6529");
    assert_eq!(info.service_provider_name, "T-MOBILE USA");
    assert_eq!(info.operating_company_number, "6664");
    assert_eq!(info.category, "WIRELESS");
    assert_eq!(info.carrier_spec_name, "T-MOBILE");
    assert_eq!(info.simplified_name, "T-Mobile");
    assert_eq!(info.display_name, "T-MOBILE");
    assert_eq!(info.ported_date, "2019-04-02T14:11:09");
    assert_eq!(info.lnp_type, "lspp");
}

#[tokio::test]
async fn test_prefix_round_trip() {
    let engine = engine(ported_reference());

    let bare = engine.resolve_routing("2163734606").await.unwrap();
    let one = engine.resolve_routing("12163734606").await.unwrap();
    let plus = engine.resolve_routing("+12163734606").await.unwrap();

    assert_eq!(one.routing_number, format!("1{}", bare.routing_number));
    assert_eq!(plus.routing_number, format!("+1{}", bare.routing_number));
    assert_eq!(one.tn, "12163734606");
    assert_eq!(one.carrier_spec_name, bare.carrier_spec_name);

    assert_eq!(engine.lrn("12163734606").await.unwrap(), "12169900000");
    assert_eq!(engine.lrn("2163734606").await.unwrap(), "2169900000");
}

#[tokio::test]
async fn test_resolve_routing_is_idempotent() {
    let engine = engine(ported_reference());

    let first = engine.resolve_routing("12163734606").await.unwrap();
    let second = engine.resolve_routing("12163734606").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unported_number_uses_dialed_npanxx() {
    let engine = engine(ported_reference());

    let info = engine.resolve_routing("2163731000").await.unwrap();

    assert_eq!(info.routing_number, "");
    assert_eq!(info.service_provider_id, "");
    assert_eq!(info.service_provider_name, "");
    assert_eq!(info.operating_company_name, "OHIO BELL TEL CO");
    assert_eq!(info.display_name, "AT&T OHIO");
    assert_eq!(engine.lrn("12163731000").await.unwrap(), "");
}

#[tokio::test]
async fn test_pool_block_fallback() {
    let reference = ported_reference().with_pool_block(NumberPoolBlock {
        npanxxx: "2163735".to_string(),
        routing_number: "2169900001".to_string(),
        service_provider_id: "6529".to_string(),
        block_service_type: "VOICE".to_string(),
        alt_billing_id: "ALT1".to_string(),
        ..Default::default()
    });
    let engine = engine(reference);

    let port = engine
        .lookup_portability("+12163735000")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(port.tn, "+12163735000");
    assert_eq!(port.lnp_type, "pool");
    assert_eq!(port.billing_id, "");
    assert_eq!(port.alt_billing_id, "ALT1");
    assert_eq!(port.service_type, "VOICE");

    let info = engine.resolve_routing("+12163735000").await.unwrap();
    assert_eq!(info.routing_number, "+12169900001");
    assert_eq!(info.lnp_type, "pool");
    assert_eq!(info.carrier_spec_name, "T-MOBILE");
}

#[tokio::test]
async fn test_per_tn_record_beats_pool_block() {
    let reference = ported_reference().with_pool_block(NumberPoolBlock {
        npanxxx: "2163734".to_string(),
        routing_number: "2160000000".to_string(),
        ..Default::default()
    });
    let engine = engine(reference);

    let port = engine.lookup_portability("2163734606").await.unwrap().unwrap();
    assert_eq!(port.routing_number, "2169900000");
    assert_eq!(port.billing_id, "0101");
    assert!(!port.is_pooled());
}

#[tokio::test]
async fn test_no_reference_data_yields_empty_routing() {
    let engine = engine(InMemoryReference::new());

    let info = engine.resolve_routing("19995550100").await.unwrap();
    assert_eq!(info, routeapi_core::models::RoutingInfo::empty("19995550100"));
    assert!(engine.lookup_portability("19995550100").await.unwrap().is_none());
}

#[tokio::test]
async fn test_display_name_falls_back_to_operating_company() {
    let reference = InMemoryReference::new()
        .with_rate_center(RateCenterRecord {
            npanxx: "216401".to_string(),
            operating_company_name: "OHIO BELL TEL CO".to_string(),
            carrier_spec_name: USE_VARIES_BY_COMPANY.to_string(),
            ..Default::default()
        })
        .with_rate_center(RateCenterRecord {
            npanxx: "216402".to_string(),
            operating_company_name: "LEVEL 3 COMMUNICATIONS".to_string(),
            carrier_spec_name: "L3".to_string(),
            ..Default::default()
        });
    let engine = engine(reference);

    let varies = engine.resolve_routing("2164015555").await.unwrap();
    assert_eq!(varies.display_name, "OHIO BELL TEL CO");
    assert_eq!(varies.carrier_spec_name, USE_VARIES_BY_COMPANY);

    let short = engine.resolve_routing("2164025555").await.unwrap();
    assert_eq!(short.display_name, "LEVEL 3 COMMUNICATIONS");
}

// ==================== LRN jurisdiction and NNMP ====================

#[tokio::test]
async fn test_lrn_jurisdiction_classifies_against_serving_switch() {
    let reference = ported_reference()
        .with_rate_center(rate_center("330562", "OH", "324", "AKRON"))
        .with_rate_center(rate_center("216990", "PA", "330", "ERIE"));
    let engine = engine(reference);

    // Dialed 216373 is in OH, but the LRN's switch is in PA
    assert_eq!(
        engine.lrn_jurisdiction("2163734606", "3305622000").await.unwrap(),
        Jurisdiction::Interstate
    );
}

#[tokio::test]
async fn test_lrn_jurisdiction_without_lrn_uses_dialed_number() {
    let reference = InMemoryReference::new()
        .with_rate_center(rate_center("216373", "OH", "320", "CLEVELAND"))
        .with_rate_center(rate_center("330562", "OH", "324", "AKRON"));
    let engine = engine(reference);

    assert_eq!(
        engine.lrn_jurisdiction("2163731000", "3305622000").await.unwrap(),
        Jurisdiction::Intrastate
    );
}

#[tokio::test]
async fn test_nnmp_lookup_is_case_insensitive() {
    let engine = engine(ported_reference());

    assert_eq!(engine.nnmp("2163734606").await.unwrap(), 310);
    // AT&T OHIO has no NNMP entry
    assert_eq!(engine.nnmp("2163731000").await.unwrap(), 0);
    assert_eq!(engine.nnmp("9995550100").await.unwrap(), 0);
}

// ==================== Metered lookups ====================

#[tokio::test]
async fn test_metered_lookup_counts_every_call() {
    let store = Arc::new(MemoryStore::new());
    let lookup = MeteredLookup::new(
        engine(ported_reference()),
        UsageMeter::new(Arc::clone(&store), keys::COUNTER_PREFIX),
    );
    let ctx = CallerContext {
        user_id: 42,
        endpoint_id: 3,
        endpoint: "FullDataCoSpec".to_string(),
        ip_address: "10.0.0.8".to_string(),
    };

    let info = lookup.resolve_routing(&ctx, "12163734606").await.unwrap();
    assert_eq!(info.routing_number, "12169900000");
    lookup.lrn(&ctx, "2163734606").await.unwrap();
    lookup
        .jurisdiction(&ctx, "2163734606", "9995550100")
        .await
        .unwrap();

    assert!(wait_for_counter(&store, "epcalls:42", "3", 3).await);
}

#[tokio::test]
async fn test_metering_outage_does_not_fail_lookup() {
    use async_trait::async_trait;
    use routeapi_core::{traits::CounterStore, AppError, AppResult};
    use std::collections::HashMap;
    use std::time::Duration;

    struct DownStore;

    #[async_trait]
    impl CounterStore for DownStore {
        async fn increment(&self, _: &str, _: &str, _: i64) -> AppResult<i64> {
            Err(AppError::CacheConnection("refused".to_string()))
        }
        async fn decrement(&self, _: &str, _: &str, _: i64) -> AppResult<i64> {
            Err(AppError::CacheConnection("refused".to_string()))
        }
        async fn scan_keys(&self, _: &str) -> AppResult<Vec<String>> {
            Err(AppError::CacheConnection("refused".to_string()))
        }
        async fn read_counters(&self, _: &str) -> AppResult<HashMap<String, i64>> {
            Err(AppError::CacheConnection("refused".to_string()))
        }
        async fn try_acquire_lock(&self, _: &str, _: &str, _: Duration) -> AppResult<bool> {
            Err(AppError::CacheConnection("refused".to_string()))
        }
        async fn release_lock(&self, _: &str, _: &str) -> AppResult<bool> {
            Err(AppError::CacheConnection("refused".to_string()))
        }
    }

    let meter = UsageMeter::new(Arc::new(DownStore), keys::COUNTER_PREFIX);
    assert!(!meter.record(1, 1).await);

    let lookup = MeteredLookup::new(engine(ported_reference()), meter);
    let ctx = CallerContext {
        user_id: 1,
        endpoint_id: 1,
        endpoint: "LRN".to_string(),
        ip_address: "127.0.0.1".to_string(),
    };
    assert_eq!(lookup.lrn(&ctx, "2163734606").await.unwrap(), "2169900000");
}
