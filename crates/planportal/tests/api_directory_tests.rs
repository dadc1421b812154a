//! Consultant directory, knowledge bases and property search.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use common::{property_with_lep, FixedLookup, MultipartBuilder, TestHarness};
use planportal::planning::PropertyMatch;

#[tokio::test]
async fn test_consultant_crud() {
    let harness = TestHarness::new();

    let created = harness
        .post_json(
            "/api/consultants",
            &json!({ "name": "Ember Co", "category": "Bushfire", "email": "office@ember.example" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let consultant = created.json();
    let uri = format!("/api/consultants/{}", consultant["id"].as_str().unwrap());

    harness
        .post_json(
            "/api/consultants",
            &json!({ "name": "Leafy", "category": "Arborist" }),
        )
        .await;

    let bushfire = harness.get("/api/consultants?category=Bushfire").await.json();
    assert_eq!(bushfire.as_array().map(Vec::len), Some(1));

    let updated = harness.put_json(&uri, &json!({ "phone": "02 9000 0000" })).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["email"], "office@ember.example");

    assert_eq!(harness.delete(&uri).await.status, StatusCode::OK);
    assert_eq!(harness.delete(&uri).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_consultant_requires_category() {
    let harness = TestHarness::new();

    let response = harness
        .post_json("/api/consultants", &json!({ "name": "Ember Co" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error().contains("category"));
}

#[tokio::test]
async fn test_ticket_fills_consultant_name_from_directory() {
    let harness = TestHarness::new();
    let consultant = harness
        .post_json(
            "/api/consultants",
            &json!({ "name": "Ember Co", "category": "Bushfire" }),
        )
        .await
        .json();
    let job = harness.create_job(&common::cumberland_job()).await;

    let ticket = harness
        .post_multipart(
            "/api/consultant-tickets",
            MultipartBuilder::new().metadata(&json!({
                "jobId": job["id"],
                "category": "Bushfire",
                "consultantId": consultant["id"]
            })),
        )
        .await
        .json();

    assert_eq!(ticket["consultantName"], "Ember Co");
}

#[tokio::test]
async fn test_kb_collections_are_separate() {
    let harness = TestHarness::new();

    let created = harness
        .post_multipart(
            "/api/kb-soee-assessments",
            MultipartBuilder::new().metadata(&json!({
                "sectionTitle": "Setbacks",
                "title": "Front setback",
                "content": "Complies with the DCP."
            })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created);

    let soee = harness.get("/api/kb-soee-assessments").await.json();
    assert_eq!(soee[0]["title"], "Setbacks");
    assert_eq!(soee[0]["assessments"][0]["title"], "Front setback");
    assert_eq!(harness.get("/api/kb-cdc-assessments").await.json(), json!([]));

    let section_id = soee[0]["id"].as_str().unwrap();
    let second = harness
        .post_multipart(
            "/api/kb-soee-assessments",
            MultipartBuilder::new()
                .text("sectionId", section_id)
                .text("title", "Side setback"),
        )
        .await;
    assert_eq!(second.status, StatusCode::CREATED);
    let soee = harness.get("/api/kb-soee-assessments").await.json();
    assert_eq!(soee[0]["assessments"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_kb_article_requires_section() {
    let harness = TestHarness::new();

    let response = harness
        .post_multipart(
            "/api/kb-custom-assessments",
            MultipartBuilder::new().text("title", "Orphan"),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pre_prepared_attachment_download() {
    let harness = TestHarness::new();
    let article = harness
        .post_multipart(
            "/api/kb-pre-prepared-assessments",
            MultipartBuilder::new()
                .metadata(&json!({ "sectionTitle": "Templates", "title": "Cover letter" }))
                .file(
                    "Cover Letter.docx",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                    b"template",
                ),
        )
        .await
        .json();
    let id = article["id"].as_str().unwrap();

    let response = harness
        .get(&format!("/api/pre-prepared-assessments/{}/download", id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.header("content-disposition"),
        Some("attachment; filename=\"Cover Letter.docx\"")
    );
    assert_eq!(&response.body[..], b"template");

    let replaced = harness
        .put_multipart(
            &format!("/api/kb-pre-prepared-assessments/{}", id),
            MultipartBuilder::new().file("Cover Letter v2.docx", "application/octet-stream", b"v2"),
        )
        .await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(replaced.json()["title"], "Cover letter");

    let deleted = harness
        .delete(&format!("/api/kb-pre-prepared-assessments/{}", id))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    let gone = harness
        .get(&format!("/api/pre-prepared-assessments/{}/download", id))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_property_search_disabled() {
    let harness = TestHarness::new();

    let response = harness.get("/api/property?address=9%20Viola%20Place").await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn test_property_search_reports_council() {
    let property_data = serde_json::from_value(property_with_lep(
        "Cumberland Local Environmental Plan 2021",
    ))
    .unwrap();
    let harness = TestHarness::with_lookup(Arc::new(FixedLookup(PropertyMatch {
        address: "9 VIOLA PLACE GREYSTANES 2145".to_string(),
        property_id: Some("123456".to_string()),
        property_data,
    })));

    let missing = harness.get("/api/property").await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let not_found = harness.get("/api/property?address=nowhere").await;
    assert_eq!(not_found.status, StatusCode::NOT_FOUND);

    let found = harness.get("/api/property?address=9%20Viola%20Place").await;
    assert_eq!(found.status, StatusCode::OK);
    let report = found.json();
    assert_eq!(report["council"], "Cumberland");
    assert_eq!(report["propertyId"], "123456");
    assert_eq!(report["propertyData"]["epiLayers"][1]["attributes"]["Zone"], "R2");
}

#[tokio::test]
async fn test_planning_instruments_listed() {
    let harness = TestHarness::new();

    let response = harness.get("/api/planning/instruments").await;

    assert_eq!(response.status, StatusCode::OK);
    let instruments = response.json();
    assert!(instruments
        .as_array()
        .is_some_and(|list| list.iter().any(|i| i["council"] == "Cumberland")));
}
