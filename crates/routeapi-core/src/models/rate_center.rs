//! Rate center model
//!
//! One row of the LERG-6 table: the serving facts for an NPANXX, plus the
//! explicit local-calling agreements between rate centers.

use serde::{Deserialize, Serialize};

/// Serving facts for a 6-digit NPANXX
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCenterRecord {
    /// NPANXX key
    pub npanxx: String,

    /// Two-letter state or province
    pub state: String,

    /// Local Access and Transport Area
    pub lata: String,

    /// Rate center abbreviation
    pub rate_center: String,

    /// Operating company number (OCN)
    pub operating_company_number: String,

    /// Operating company name
    pub operating_company_name: String,

    /// Carrier category (ILEC, CLEC, WIRELESS, ...)
    pub category: String,

    /// Carrier spec name as published in the LERG
    pub carrier_spec_name: String,
}

impl RateCenterRecord {
    /// Two records describe the same rating point when state, LATA and
    /// rate center all match.
    pub fn same_rating_point(&self, other: &RateCenterRecord) -> bool {
        self.state == other.state && self.lata == other.lata && self.rate_center == other.rate_center
    }

    /// Directional agreement key from this rate center to `to`
    pub fn agreement_to(&self, to: &RateCenterRecord) -> LocalAgreement {
        LocalAgreement {
            from_rate_center: self.rate_center.clone(),
            from_state: self.state.clone(),
            from_lata: self.lata.clone(),
            to_rate_center: to.rate_center.clone(),
            to_state: to.state.clone(),
            to_lata: to.lata.clone(),
        }
    }
}

/// Explicit local-calling exception between two rate centers.
///
/// Agreements are directional: an entry from A to B says nothing about B to A.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalAgreement {
    pub from_rate_center: String,
    pub from_state: String,
    pub from_lata: String,
    pub to_rate_center: String,
    pub to_state: String,
    pub to_lata: String,
}
