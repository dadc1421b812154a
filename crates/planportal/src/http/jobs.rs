use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde_json::{json, Value};

use crate::model::{Job, JobRecord};
use crate::portal::NewJob;

use super::error::ApiError;
use super::{download, AppState};

pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<JobRecord>>, ApiError> {
    state.run(|portal| portal.list_jobs()).await.map(Json)
}

pub(super) async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewJob>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let Json(input) = body?;
    let job = state.run(move |portal| portal.create_job(input)).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub(super) async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    state.run(move |portal| portal.job_record(&id)).await.map(Json)
}

pub(super) async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<JobRecord>, ApiError> {
    let Json(body) = body?;
    state
        .run(move |portal| portal.replace_job(&id, body))
        .await
        .map(Json)
}

pub(super) async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<JobRecord>, ApiError> {
    let Json(body) = body?;
    let Value::Object(fields) = body else {
        return Err(ApiError::bad_request("Patch body must be a JSON object"));
    };
    state
        .run(move |portal| portal.patch_job(&id, fields))
        .await
        .map(Json)
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.run(move |portal| portal.delete_job(&id)).await?;
    Ok(Json(json!({ "success": true })))
}

pub(super) async fn download_document(
    State(state): State<AppState>,
    Path((id, key)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (doc, path) = state
        .run(move |portal| portal.job_document(&id, &key))
        .await?;
    download::attachment(&path, &doc.file.original_name, doc.file.content_type.as_deref()).await
}
