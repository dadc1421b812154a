//! Property and planning-layer lookup.
//!
//! [`PropertyLookup`] resolves an address to the planning layers that apply
//! to it. [`PlanningPortalClient`] is the implementation backed by the
//! government planning API; [`DisabledLookup`] is used when the API is
//! switched off in configuration.

pub mod client;
pub mod instruments;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::model::PropertyData;

pub use client::PlanningPortalClient;
pub use instruments::{lookup_by_council, lookup_by_lep, PlanningInstrument, INSTRUMENTS};

#[derive(Error, Debug)]
pub enum PropertyError {
    #[error("Address not found: {0}")]
    AddressNotFound(String),

    #[error("Property lookup is disabled")]
    Disabled,

    #[error("Planning service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Planning service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Unexpected planning service response: {0}")]
    Malformed(String),
}

/// The property an address resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMatch {
    /// Address as the planning service spells it.
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub property_data: PropertyData,
}

#[async_trait]
pub trait PropertyLookup: Send + Sync {
    async fn lookup(&self, address: &str) -> Result<PropertyMatch, PropertyError>;
}

/// Lookup used when the property API is disabled.
pub struct DisabledLookup;

#[async_trait]
impl PropertyLookup for DisabledLookup {
    async fn lookup(&self, _address: &str) -> Result<PropertyMatch, PropertyError> {
        Err(PropertyError::Disabled)
    }
}

/// Council for a property: the text before ` Local Environmental Plan` in
/// the LEP layer's `EPI Name`, else the instruments table entry for that
/// LEP.
pub fn derive_council(data: &PropertyData) -> Option<String> {
    if let Some(council) = data.council_from_lep() {
        return Some(council);
    }
    data.lep_name()
        .and_then(lookup_by_lep)
        .map(|i| i.council.to_string())
}

/// Property search result as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyReport {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub property_data: PropertyData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub council: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<PlanningInstrument>,
}

impl From<PropertyMatch> for PropertyReport {
    fn from(found: PropertyMatch) -> Self {
        let council = derive_council(&found.property_data);
        let instrument = found
            .property_data
            .lep_name()
            .and_then(lookup_by_lep)
            .or_else(|| council.as_deref().and_then(lookup_by_council))
            .copied();
        Self {
            address: found.address,
            property_id: found.property_id,
            property_data: found.property_data,
            council,
            instrument,
        }
    }
}
