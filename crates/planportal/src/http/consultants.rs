use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::model::{Consultant, ConsultantInput};

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub(super) struct ConsultantQuery {
    #[serde(default)]
    category: Option<String>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    query: Result<Query<ConsultantQuery>, QueryRejection>,
) -> Result<Json<Vec<Consultant>>, ApiError> {
    let Query(query) = query?;
    state
        .run(move |portal| portal.list_consultants(query.category.as_deref()))
        .await
        .map(Json)
}

pub(super) async fn create(
    State(state): State<AppState>,
    body: Result<Json<ConsultantInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Consultant>), ApiError> {
    let Json(input) = body?;
    let consultant = state
        .run(move |portal| portal.create_consultant(input))
        .await?;
    Ok((StatusCode::CREATED, Json(consultant)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ConsultantInput>, JsonRejection>,
) -> Result<Json<Consultant>, ApiError> {
    let Json(input) = body?;
    state
        .run(move |portal| portal.update_consultant(&id, input))
        .await
        .map(Json)
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.run(move |portal| portal.delete_consultant(&id)).await?;
    Ok(Json(json!({ "success": true })))
}
