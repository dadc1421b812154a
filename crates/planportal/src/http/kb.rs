//! Knowledge-base collections, one route set per [`KbKind`].

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::model::{KbArticle, KbArticleInput, KbKind, KbSection};

use super::error::ApiError;
use super::multipart::UploadForm;
use super::{download, AppState};

/// Mounts `/api/kb-<kind>-assessments` and its article routes.
pub(super) fn routes(router: Router<AppState>, kind: KbKind) -> Router<AppState> {
    let base = format!("/api/{}", kind.collection());
    router
        .route(
            &base,
            get(move |state: State<AppState>| list(state, kind)).post(
                move |state: State<AppState>, multipart: Multipart| create(state, kind, multipart),
            ),
        )
        .route(
            &format!("{}/{{id}}", base),
            put(
                move |state: State<AppState>, id: Path<String>, multipart: Multipart| {
                    update(state, kind, id, multipart)
                },
            )
            .delete(move |state: State<AppState>, id: Path<String>| remove(state, kind, id)),
        )
        .route(
            &format!("{}/{{id}}/download", base),
            get(move |state: State<AppState>, id: Path<String>| download_attachment(state, kind, id)),
        )
}

async fn list(State(state): State<AppState>, kind: KbKind) -> Result<Json<Vec<KbSection>>, ApiError> {
    state.run(move |portal| portal.list_kb(kind)).await.map(Json)
}

async fn create(
    State(state): State<AppState>,
    kind: KbKind,
    multipart: Multipart,
) -> Result<(StatusCode, Json<KbArticle>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let input: KbArticleInput = form.metadata()?;
    let upload = form.take_file();
    let article = state
        .run(move |portal| portal.create_kb_article(kind, input, upload))
        .await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn update(
    State(state): State<AppState>,
    kind: KbKind,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<KbArticle>, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let input: KbArticleInput = form.metadata()?;
    let upload = form.take_file();
    state
        .run(move |portal| portal.update_kb_article(kind, &id, input, upload))
        .await
        .map(Json)
}

async fn remove(
    State(state): State<AppState>,
    kind: KbKind,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .run(move |portal| portal.delete_kb_article(kind, &id))
        .await?;
    Ok(Json(json!({ "success": true })))
}

async fn download_attachment(
    State(state): State<AppState>,
    kind: KbKind,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (attachment, path) = state
        .run(move |portal| portal.kb_article_file(kind, &id))
        .await?;
    download::attachment(
        &path,
        &attachment.original_name,
        attachment.content_type.as_deref(),
    )
    .await
}

/// `GET /api/pre-prepared-assessments/{id}/download`
pub(super) async fn download_pre_prepared(
    state: State<AppState>,
    id: Path<String>,
) -> Result<Response, ApiError> {
    download_attachment(state, KbKind::PrePrepared, id).await
}
