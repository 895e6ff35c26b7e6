//! Resolution results
//!
//! `Jurisdiction` classifies a call between two numbers; `RoutingInfo` is the
//! merged routing answer for one telephone number.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Carrier spec name used by the LERG when the name depends on the company
pub const USE_VARIES_BY_COMPANY: &str = "USE VARIES BY COMPANY";

/// Spec names this short are abbreviations, not readable labels
const MIN_SPEC_LABEL_LEN: usize = 3;

/// Call jurisdiction classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    Local,
    Intrastate,
    Interstate,
    /// Either number is missing from the rate-center data
    Unknown,
}

impl Jurisdiction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Jurisdiction::Local => "Local",
            Jurisdiction::Intrastate => "Intrastate",
            Jurisdiction::Interstate => "Interstate",
            Jurisdiction::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Jurisdiction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Local" => Ok(Jurisdiction::Local),
            "Intrastate" => Ok(Jurisdiction::Intrastate),
            "Interstate" => Ok(Jurisdiction::Interstate),
            "Unknown" => Ok(Jurisdiction::Unknown),
            _ => Err(format!("Invalid jurisdiction: {}", s)),
        }
    }
}

/// Merged routing answer for a telephone number.
///
/// Every field is a plain string; missing reference data leaves it empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingInfo {
    /// The number as the caller supplied it
    pub tn: String,

    /// LRN with the caller's dialing prefix restored
    pub routing_number: String,

    /// Service provider id (SPID) of the current owner
    pub service_provider_id: String,

    /// Display name for the SPID
    pub service_provider_name: String,

    /// OCN of the serving switch
    pub operating_company_number: String,

    /// Operating company name of the serving switch
    pub operating_company_name: String,

    /// Carrier category of the serving switch
    pub category: String,

    /// Carrier spec name of the serving switch
    pub carrier_spec_name: String,

    /// Simplified carrier name for the spec name
    pub simplified_name: String,

    /// Human-readable carrier label
    pub display_name: String,

    /// Activation timestamp of the port
    pub ported_date: String,

    /// LNP type (`pool` when answered from a thousand-block)
    pub lnp_type: String,
}

impl RoutingInfo {
    /// Empty answer for a number with no reference data at all
    pub fn empty(tn: &str) -> Self {
        Self {
            tn: tn.to_string(),
            ..Default::default()
        }
    }

    /// Pick the human-readable carrier label.
    ///
    /// The spec name wins when it is a real name; the sentinel
    /// `USE VARIES BY COMPANY` and short abbreviations fall back to the
    /// operating company name.
    pub fn carrier_label(carrier_spec_name: &str, operating_company_name: &str) -> String {
        if carrier_spec_name == USE_VARIES_BY_COMPANY {
            return operating_company_name.to_string();
        }
        if carrier_spec_name.chars().count() > MIN_SPEC_LABEL_LEN {
            carrier_spec_name.to_string()
        } else {
            operating_company_name.to_string()
        }
    }
}
