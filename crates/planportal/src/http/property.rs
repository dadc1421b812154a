use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::PortalError;
use crate::planning::{PlanningInstrument, PropertyReport, INSTRUMENTS};

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub(super) struct PropertyQuery {
    #[serde(default)]
    address: Option<String>,
}

/// Resolves an address to its planning layers, council and instrument.
pub(super) async fn search(
    State(state): State<AppState>,
    query: Result<Query<PropertyQuery>, QueryRejection>,
) -> Result<Json<PropertyReport>, ApiError> {
    let Query(query) = query?;
    let address = query
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or(PortalError::MissingField("address"))?
        .to_string();

    let found = state.property.lookup(&address).await?;
    log::debug!("Property search for {:?} matched {:?}", address, found.address);
    Ok(Json(PropertyReport::from(found)))
}

pub(super) async fn instruments() -> Json<&'static [PlanningInstrument]> {
    Json(INSTRUMENTS)
}
