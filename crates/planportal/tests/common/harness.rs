//! Test harness for isolated API tests.
//!
//! `TestHarness` opens a portal in a temporary data directory and drives the
//! full router in-process, one request at a time.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use planportal::planning::{PropertyError, PropertyLookup, PropertyMatch};
use planportal::{router, AppState, DisabledLookup, Portal};

use super::builders::MultipartBuilder;

/// Upload limit used by the harness router.
pub const TEST_UPLOAD_LIMIT: usize = 1024 * 1024;

/// Lookup that answers every address with the same match.
pub struct FixedLookup(pub PropertyMatch);

#[async_trait]
impl PropertyLookup for FixedLookup {
    async fn lookup(&self, address: &str) -> Result<PropertyMatch, PropertyError> {
        if address.eq_ignore_ascii_case("nowhere") {
            return Err(PropertyError::AddressNotFound(address.to_string()));
        }
        Ok(self.0.clone())
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "Response body is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `error` message of a failed request.
    pub fn error(&self) -> String {
        self.json()["error"]
            .as_str()
            .expect("error body has an `error` string")
            .to_string()
    }
}

/// Isolated portal plus the router serving it.
pub struct TestHarness {
    temp_dir: TempDir,
    app: Router,
}

impl TestHarness {
    /// Create a harness with property lookup disabled.
    pub fn new() -> Self {
        Self::with_lookup(Arc::new(DisabledLookup))
    }

    pub fn with_lookup(lookup: Arc<dyn PropertyLookup>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let portal = Portal::open(temp_dir.path()).expect("Failed to open portal");
        let app = router(AppState::new(portal, lookup, TEST_UPLOAD_LIMIT));
        Self { temp_dir, app }
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(request(Method::GET, uri, Body::empty(), None)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(request(Method::DELETE, uri, Body::empty(), None))
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send_json(Method::POST, uri, body).await
    }

    pub async fn put_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send_json(Method::PUT, uri, body).await
    }

    pub async fn patch_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send_json(Method::PATCH, uri, body).await
    }

    pub async fn post_multipart(&self, uri: &str, form: MultipartBuilder) -> TestResponse {
        self.send_multipart(Method::POST, uri, form).await
    }

    pub async fn put_multipart(&self, uri: &str, form: MultipartBuilder) -> TestResponse {
        self.send_multipart(Method::PUT, uri, form).await
    }

    async fn send_json(&self, method: Method, uri: &str, body: &Value) -> TestResponse {
        self.send(request(
            method,
            uri,
            Body::from(body.to_string()),
            Some("application/json".to_string()),
        ))
        .await
    }

    async fn send_multipart(
        &self,
        method: Method,
        uri: &str,
        form: MultipartBuilder,
    ) -> TestResponse {
        let (content_type, body) = form.build();
        self.send(request(method, uri, Body::from(body), Some(content_type)))
            .await
    }

    /// Creates a job and returns its JSON.
    pub async fn create_job(&self, body: &Value) -> Value {
        let response = self.post_json("/api/jobs", body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response);
        response.json()
    }
}

fn request(method: Method, uri: &str, body: Body, content_type: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).expect("valid request")
}
