//! Number portability models
//!
//! `PortabilityRecord` is the per-TN routing owner of a ported number;
//! `NumberPoolBlock` carries the same facts for a whole thousand-block and is
//! consulted only when no per-TN record exists. Both collapse into
//! `PortabilityInfo` for callers.

use serde::{Deserialize, Serialize};

/// LNP type reported for answers synthesized from a pool block
pub const POOL_LNP_TYPE: &str = "pool";

/// Current routing owner of one ported 10-digit number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortabilityRecord {
    pub tn: String,
    pub routing_number: String,
    pub service_provider_id: String,
    pub alt_service_provider_id: String,
    pub activation_timestamp: String,
    pub lnp_type: String,
    pub service_type: String,
    pub alt_end_user_location_type: String,
    pub alt_end_user_location_value: String,
    pub alt_billing_id: String,
    pub billing_id: String,
    pub voice_uri: String,
    pub mms_uri: String,
    pub sms_uri: String,
}

/// Porting metadata for a 1000-number block (NPANXXX)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberPoolBlock {
    pub npanxxx: String,
    pub routing_number: String,
    pub service_provider_id: String,
    pub alt_service_provider_id: String,
    pub activation_timestamp: String,
    pub block_service_type: String,
    pub alt_end_user_location_type: String,
    pub alt_end_user_location_value: String,
    pub alt_billing_id: String,
    pub voice_uri: String,
    pub mms_uri: String,
    pub sms_uri: String,
}

/// Portability answer for a telephone number, from either source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortabilityInfo {
    /// The number as the caller supplied it
    pub tn: String,
    /// Location routing number, without any dialing prefix
    pub routing_number: String,
    pub service_provider_id: String,
    pub alt_service_provider_id: String,
    pub activation_timestamp: String,
    pub lnp_type: String,
    pub service_type: String,
    pub alt_end_user_location_type: String,
    pub alt_end_user_location_value: String,
    pub alt_billing_id: String,
    pub billing_id: String,
    pub voice_uri: String,
    pub mms_uri: String,
    pub sms_uri: String,
}

impl PortabilityInfo {
    /// Build from a per-TN record
    pub fn from_record(tn: &str, record: PortabilityRecord) -> Self {
        Self {
            tn: tn.to_string(),
            routing_number: record.routing_number,
            service_provider_id: record.service_provider_id,
            alt_service_provider_id: record.alt_service_provider_id,
            activation_timestamp: record.activation_timestamp,
            lnp_type: record.lnp_type,
            service_type: record.service_type,
            alt_end_user_location_type: record.alt_end_user_location_type,
            alt_end_user_location_value: record.alt_end_user_location_value,
            alt_billing_id: record.alt_billing_id,
            billing_id: record.billing_id,
            voice_uri: record.voice_uri,
            mms_uri: record.mms_uri,
            sms_uri: record.sms_uri,
        }
    }

    /// Synthesize from a pool block; blocks carry no per-number billing id
    pub fn from_pool_block(tn: &str, block: NumberPoolBlock) -> Self {
        Self {
            tn: tn.to_string(),
            routing_number: block.routing_number,
            service_provider_id: block.service_provider_id,
            alt_service_provider_id: block.alt_service_provider_id,
            activation_timestamp: block.activation_timestamp,
            lnp_type: POOL_LNP_TYPE.to_string(),
            service_type: block.block_service_type,
            alt_end_user_location_type: block.alt_end_user_location_type,
            alt_end_user_location_value: block.alt_end_user_location_value,
            alt_billing_id: block.alt_billing_id,
            billing_id: String::new(),
            voice_uri: block.voice_uri,
            mms_uri: block.mms_uri,
            sms_uri: block.sms_uri,
        }
    }

    pub fn is_pooled(&self) -> bool {
        self.lnp_type == POOL_LNP_TYPE
    }
}
