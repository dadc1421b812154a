//! Consultant tickets, consultant work orders and internal work tickets.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::PortalError;
use crate::model::{
    ConsultantTicket, NewConsultantTicket, NewWorkTicket, TicketFilter, WorkOrderFile,
    WorkTicket,
};
use crate::portal::Upload;

use super::error::ApiError;
use super::multipart::UploadForm;
use super::AppState;

/// Body of the return and complete endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TicketRef {
    #[serde(default)]
    ticket_id: Option<String>,
}

impl TicketRef {
    fn id(self) -> Result<String, ApiError> {
        self.ticket_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PortalError::MissingField("ticketId").into())
    }
}

/// The `ticketId` and file of an upload form.
struct ReportUpload {
    ticket_id: String,
    upload: Upload,
    uploaded_by: Option<String>,
}

impl ReportUpload {
    fn from_form(mut form: UploadForm) -> Result<Self, ApiError> {
        let ticket_id = form
            .text("ticketId")
            .ok_or(PortalError::MissingField("ticketId"))?;
        let upload = form.take_file().ok_or(PortalError::MissingField("file"))?;
        Ok(Self {
            ticket_id,
            upload,
            uploaded_by: form.text("uploadedBy"),
        })
    }
}

pub(super) async fn list_consultant(
    State(state): State<AppState>,
    query: Result<Query<TicketFilter>, QueryRejection>,
) -> Result<Json<Vec<ConsultantTicket>>, ApiError> {
    let Query(filter) = query?;
    state
        .run(move |portal| portal.list_consultant_tickets(&filter))
        .await
        .map(Json)
}

pub(super) async fn get_consultant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConsultantTicket>, ApiError> {
    state
        .run(move |portal| portal.get_consultant_ticket(&id))
        .await
        .map(Json)
}

pub(super) async fn create_consultant(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ConsultantTicket>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let meta: NewConsultantTicket = form.metadata()?;
    let upload = form.take_file();
    let ticket = state
        .run(move |portal| portal.create_consultant_ticket(meta, upload))
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub(super) async fn upload_consultant(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConsultantTicket>, ApiError> {
    let report = ReportUpload::from_form(UploadForm::read(multipart).await?)?;
    state
        .run(move |portal| {
            portal.upload_consultant_report(&report.ticket_id, report.upload, report.uploaded_by)
        })
        .await
        .map(Json)
}

pub(super) async fn return_consultant(
    State(state): State<AppState>,
    body: Result<Json<TicketRef>, JsonRejection>,
) -> Result<Json<ConsultantTicket>, ApiError> {
    let Json(body) = body?;
    let ticket_id = body.id()?;
    state
        .run(move |portal| portal.return_consultant_ticket(&ticket_id))
        .await
        .map(Json)
}

/// Accepts either file of a work order; the `type` field says which.
pub(super) async fn upload_work_order(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConsultantTicket>, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let kind = form.text("type").ok_or(PortalError::MissingField("type"))?;
    let kind = WorkOrderFile::parse(&kind).ok_or_else(|| {
        ApiError::bad_request(format!(
            "Invalid type {:?}: expected \"report\" or \"invoice\"",
            kind
        ))
    })?;
    let report = ReportUpload::from_form(form)?;
    state
        .run(move |portal| {
            portal.upload_work_order_file(
                &report.ticket_id,
                kind,
                report.upload,
                report.uploaded_by,
            )
        })
        .await
        .map(Json)
}

pub(super) async fn complete_work_order(
    State(state): State<AppState>,
    body: Result<Json<TicketRef>, JsonRejection>,
) -> Result<Json<ConsultantTicket>, ApiError> {
    let Json(body) = body?;
    let ticket_id = body.id()?;
    state
        .run(move |portal| portal.complete_work_order(&ticket_id))
        .await
        .map(Json)
}

pub(super) async fn list_work(
    State(state): State<AppState>,
    query: Result<Query<TicketFilter>, QueryRejection>,
) -> Result<Json<Vec<WorkTicket>>, ApiError> {
    let Query(filter) = query?;
    state
        .run(move |portal| portal.list_work_tickets(&filter))
        .await
        .map(Json)
}

pub(super) async fn get_work(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkTicket>, ApiError> {
    state
        .run(move |portal| portal.get_work_ticket(&id))
        .await
        .map(Json)
}

pub(super) async fn create_work(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<WorkTicket>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let meta: NewWorkTicket = form.metadata()?;
    let upload = form.take_file();
    let ticket = state
        .run(move |portal| portal.create_work_ticket(meta, upload))
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub(super) async fn upload_work(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<WorkTicket>, ApiError> {
    let report = ReportUpload::from_form(UploadForm::read(multipart).await?)?;
    state
        .run(move |portal| {
            portal.upload_work_report(&report.ticket_id, report.upload, report.uploaded_by)
        })
        .await
        .map(Json)
}

pub(super) async fn return_work(
    State(state): State<AppState>,
    body: Result<Json<TicketRef>, JsonRejection>,
) -> Result<Json<WorkTicket>, ApiError> {
    let Json(body) = body?;
    let ticket_id = body.id()?;
    state
        .run(move |portal| portal.return_work_ticket(&ticket_id))
        .await
        .map(Json)
}
