use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::document_repo::DocumentFilter;
use crate::error::PortalError;
use crate::model::{Document, DocumentMetadataInput};
use crate::portal::DocumentUpdate;

use super::error::ApiError;
use super::multipart::UploadForm;
use super::{download, AppState};

#[derive(Debug, Default, Deserialize)]
pub(super) struct DownloadQuery {
    #[serde(default)]
    version: Option<u32>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    query: Result<Query<DocumentFilter>, QueryRejection>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let Query(filter) = query?;
    state
        .run(move |portal| portal.list_documents(&filter))
        .await
        .map(Json)
}

pub(super) async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let meta: DocumentMetadataInput = form.metadata()?;
    let upload = form.take_file();
    let doc = state
        .run(move |portal| portal.create_document(meta, upload))
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

pub(super) async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    state.run(move |portal| portal.get_document(&id)).await.map(Json)
}

/// `POST /api/documents/{id}` uploads the next version.
pub(super) async fn add_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Document>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let uploaded_by = form.text("uploadedBy");
    let upload = form
        .take_file()
        .ok_or_else(|| ApiError::from(PortalError::MissingField("file")))?;
    state
        .run(move |portal| portal.add_version(&id, upload, uploaded_by))
        .await
        .map(Json)
}

pub(super) async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<DocumentUpdate>, JsonRejection>,
) -> Result<Json<Document>, ApiError> {
    let Json(update) = body?;
    state
        .run(move |portal| portal.update_document(&id, update))
        .await
        .map(Json)
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.run(move |portal| portal.delete_document(&id)).await?;
    Ok(Json(json!({ "success": true })))
}

pub(super) async fn remove_version(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError> {
    let version: u32 = version
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid version: {}", version)))?;
    state
        .run(move |portal| portal.delete_version(&id, version))
        .await
        .map(Json)
}

pub(super) async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let (version, path) = state
        .run(move |portal| portal.document_file(&id, query.version))
        .await?;
    download::attachment(&path, &version.original_name, version.content_type.as_deref()).await
}
