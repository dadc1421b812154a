//! JSON-over-HTTP surface of the portal.
//!
//! Handlers parse the request, hand the work to [`Portal`] on the blocking
//! pool and render the result. Every failure is rendered as
//! `{"error": message}` by [`ApiError`].

mod consultants;
mod documents;
mod download;
mod error;
mod jobs;
mod kb;
mod middleware;
mod multipart;
mod property;
mod tickets;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::model::KbKind;
use crate::planning::PropertyLookup;
use crate::portal::Portal;

pub use error::ApiError;
pub use middleware::REQUEST_ID_HEADER;
pub use multipart::UploadForm;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub portal: Arc<Portal>,
    pub property: Arc<dyn PropertyLookup>,
    /// Largest accepted request body, uploads included.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(portal: Portal, property: Arc<dyn PropertyLookup>, max_upload_bytes: usize) -> Self {
        Self {
            portal: Arc::new(portal),
            property,
            max_upload_bytes,
        }
    }

    /// Runs `f` against the portal on the blocking pool.
    pub(crate) async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Portal) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let portal = Arc::clone(&self.portal);
        tokio::task::spawn_blocking(move || f(&portal))
            .await
            .map_err(|e| {
                log::error!("Portal task failed: {}", e);
                ApiError::internal()
            })?
            .map_err(ApiError::from)
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    let mut router = Router::new()
        .route("/api/jobs", get(jobs::list).post(jobs::create))
        .route(
            "/api/jobs/{id}",
            get(jobs::get)
                .put(jobs::replace)
                .patch(jobs::patch)
                .delete(jobs::remove),
        )
        .route(
            "/api/jobs/{id}/documents/{key}/download",
            get(jobs::download_document),
        )
        .route(
            "/api/documents",
            get(documents::list).post(documents::create),
        )
        .route(
            "/api/documents/{id}",
            get(documents::get)
                .post(documents::add_version)
                .put(documents::update)
                .delete(documents::remove),
        )
        .route(
            "/api/documents/{id}/versions/{version}",
            delete(documents::remove_version),
        )
        .route("/api/documents/{id}/download", get(documents::download))
        .route(
            "/api/consultant-tickets",
            get(tickets::list_consultant).post(tickets::create_consultant),
        )
        .route(
            "/api/consultant-tickets/upload",
            post(tickets::upload_consultant),
        )
        .route(
            "/api/consultant-tickets/return",
            post(tickets::return_consultant),
        )
        .route("/api/consultant-tickets/{id}", get(tickets::get_consultant))
        .route(
            "/api/consultant-work-orders/upload",
            post(tickets::upload_work_order),
        )
        .route(
            "/api/consultant-work-orders/complete",
            post(tickets::complete_work_order),
        )
        .route(
            "/api/work-tickets",
            get(tickets::list_work).post(tickets::create_work),
        )
        .route("/api/work-tickets/upload", post(tickets::upload_work))
        .route("/api/work-tickets/return", post(tickets::return_work))
        .route("/api/work-tickets/{id}", get(tickets::get_work))
        .route(
            "/api/consultants",
            get(consultants::list).post(consultants::create),
        )
        .route(
            "/api/consultants/{id}",
            put(consultants::update).delete(consultants::remove),
        )
        .route("/api/property", get(property::search))
        .route("/api/planning/instruments", get(property::instruments))
        .route(
            "/api/pre-prepared-assessments/{id}/download",
            get(kb::download_pre_prepared),
        );

    for kind in KbKind::ALL {
        router = kb::routes(router, kind);
    }

    router
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
