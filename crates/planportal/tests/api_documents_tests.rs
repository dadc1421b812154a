//! Document library endpoints: uploads, versions and downloads.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{cumberland_job, MultipartBuilder, TestHarness};

async fn create_document(harness: &TestHarness, metadata: Value) -> Value {
    let response = harness
        .post_multipart(
            "/api/documents",
            MultipartBuilder::new()
                .metadata(&metadata)
                .pdf("plan.pdf", "v1"),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response);
    response.json()
}

#[tokio::test]
async fn test_create_document_defaults() {
    let harness = TestHarness::new();

    let doc = create_document(&harness, json!({})).await;

    assert_eq!(doc["title"], "plan.pdf");
    assert_eq!(doc["category"], "general");
    assert_eq!(doc["path"], "/");
    assert_eq!(doc["currentVersion"], 1);
    assert_eq!(doc["versions"][0]["uploadedBy"], "admin");
    assert_eq!(doc["versions"][0]["originalName"], "plan.pdf");
}

#[tokio::test]
async fn test_create_document_requires_file() {
    let harness = TestHarness::new();

    let response = harness
        .post_multipart(
            "/api/documents",
            MultipartBuilder::new().metadata(&json!({ "title": "Empty" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error().contains("file"));
}

#[tokio::test]
async fn test_create_document_for_missing_job() {
    let harness = TestHarness::new();

    let response = harness
        .post_multipart(
            "/api/documents",
            MultipartBuilder::new()
                .metadata(&json!({ "jobId": "no-such-job" }))
                .pdf("plan.pdf", "v1"),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let docs = harness.get("/api/documents").await.json();
    assert_eq!(docs, json!([]));
}

#[tokio::test]
async fn test_new_version_increments_by_one() {
    let harness = TestHarness::new();
    let job = harness.create_job(&cumberland_job()).await;
    let job_id = job["id"].as_str().unwrap();
    let doc = create_document(
        &harness,
        json!({ "jobId": job_id, "documentKey": "Architectural Plans", "category": "plans" }),
    )
    .await;
    let id = doc["id"].as_str().unwrap();

    let response = harness
        .post_multipart(
            &format!("/api/documents/{}", id),
            MultipartBuilder::new()
                .text("uploadedBy", "jane")
                .pdf("plan-rev-b.pdf", "v2"),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let updated = response.json();

    assert_eq!(updated["currentVersion"], 2);
    assert_eq!(updated["versions"].as_array().map(Vec::len), Some(2));
    assert_eq!(updated["versions"][1]["uploadedBy"], "jane");

    let job = harness.get(&format!("/api/jobs/{}", job_id)).await.json();
    let mirrored = &job["documents"]["Architectural Plans"];
    assert_eq!(mirrored["version"], 2);
    assert_eq!(mirrored["originalName"], "plan-rev-b.pdf");
}

#[tokio::test]
async fn test_download_latest_and_specific_version() {
    let harness = TestHarness::new();
    let doc = create_document(&harness, json!({ "category": "plans" })).await;
    let id = doc["id"].as_str().unwrap();
    harness
        .post_multipart(
            &format!("/api/documents/{}", id),
            MultipartBuilder::new().pdf("plan-final.pdf", "v2"),
        )
        .await;

    let latest = harness.get(&format!("/api/documents/{}/download", id)).await;
    assert_eq!(latest.status, StatusCode::OK);
    assert_eq!(
        latest.header("content-disposition"),
        Some("attachment; filename=\"plan-final.pdf\"")
    );
    assert!(String::from_utf8_lossy(&latest.body).contains("v2"));

    let first = harness
        .get(&format!("/api/documents/{}/download?version=1", id))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&first.body).contains("v1"));

    let missing = harness
        .get(&format!("/api/documents/{}/download?version=9", id))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_and_filter_by_category() {
    let harness = TestHarness::new();
    let doc = create_document(&harness, json!({ "category": "plans" })).await;
    create_document(&harness, json!({ "category": "reports" })).await;
    let id = doc["id"].as_str().unwrap();

    let response = harness
        .put_json(
            &format!("/api/documents/{}", id),
            &json!({ "title": "Ground floor plan", "category": "drawings" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["title"], "Ground floor plan");

    let drawings = harness.get("/api/documents?category=drawings").await.json();
    assert_eq!(drawings.as_array().map(Vec::len), Some(1));
    assert_eq!(drawings[0]["id"], doc["id"]);
}

#[tokio::test]
async fn test_delete_version_and_document() {
    let harness = TestHarness::new();
    let doc = create_document(&harness, json!({})).await;
    let id = doc["id"].as_str().unwrap();
    harness
        .post_multipart(
            &format!("/api/documents/{}", id),
            MultipartBuilder::new().pdf("plan.pdf", "v2"),
        )
        .await;

    let response = harness
        .delete(&format!("/api/documents/{}/versions/2", id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["currentVersion"], 1);

    let invalid = harness
        .delete(&format!("/api/documents/{}/versions/two", id))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let deleted = harness.delete(&format!("/api/documents/{}", id)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    let gone = harness.get(&format!("/api/documents/{}", id)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert!(gone.json()["error"].is_string());
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let harness = TestHarness::new();
    let big = vec![b'x'; common::harness::TEST_UPLOAD_LIMIT + 1024];

    let response = harness
        .post_multipart(
            "/api/documents",
            MultipartBuilder::new().file("big.bin", "application/octet-stream", &big),
        )
        .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(response.json()["error"].is_string());
}
