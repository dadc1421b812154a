//! Builders for request bodies used across the API tests.

#![allow(dead_code)]

use serde_json::{json, Value};

const BOUNDARY: &str = "planportal-test-boundary";

/// Builder for `multipart/form-data` bodies.
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    /// Add a text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    /// Add the `metadata` field as JSON.
    pub fn metadata(self, value: &Value) -> Self {
        self.text("metadata", &value.to_string())
    }

    /// Add the `file` field.
    pub fn file(mut self, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Add a small PDF-looking file.
    pub fn pdf(self, file_name: &str, marker: &str) -> Self {
        let bytes = format!("%PDF-1.4\n% {}\n", marker);
        self.file(file_name, "application/pdf", bytes.as_bytes())
    }

    /// Content type header value and body bytes.
    pub fn build(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        (
            format!("multipart/form-data; boundary={}", BOUNDARY),
            self.body,
        )
    }
}

/// Property data whose LEP layer names the given instrument.
pub fn property_with_lep(epi_name: &str) -> Value {
    json!({
        "coordinates": { "latitude": -33.83, "longitude": 150.95 },
        "epiLayers": [
            { "layer": "Local Environmental Plan", "attributes": { "EPI Name": epi_name } },
            { "layer": "Land Zoning", "attributes": { "Zone": "R2" } }
        ],
        "protectionLayers": [],
        "otherLayers": []
    })
}

/// Body for `POST /api/jobs` at a Cumberland address.
pub fn cumberland_job() -> Value {
    json!({
        "address": "9 Viola Place, Greystanes NSW 2145",
        "propertyData": property_with_lep("Cumberland Local Environmental Plan 2021")
    })
}
