//! Document records with version history, and the file references that
//! tickets and jobs point at.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a file stored below the data directory.
///
/// Job files written by earlier clients carry partial references (no
/// `storedPath`, no `uploadedAt`), so every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// Name of the file on disk.
    #[serde(default)]
    pub file_name: String,
    /// Name the uploader gave the file.
    #[serde(default)]
    pub original_name: String,
    /// Path relative to the data directory. Empty when unknown.
    #[serde(default)]
    pub stored_path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

/// One uploaded revision of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub version: u32,
    pub file_name: String,
    pub original_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub stored_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    /// Logical location in the client UI, e.g. `/jobs/<id>/reports`.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Key under `job.documents` when the document is mirrored onto a job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_key: Option<String>,
    #[serde(default)]
    pub versions: Vec<DocumentVersion>,
    #[serde(default)]
    pub current_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A document with no versions yet.
    pub fn new(
        title: impl Into<String>,
        path: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            path: path.into(),
            category: category.into(),
            job_id: None,
            document_key: None,
            versions: Vec::new(),
            current_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn next_version(&self) -> u32 {
        self.current_version + 1
    }

    /// Appends a version; `version.version` must be [`Document::next_version`].
    pub fn push_version(&mut self, version: DocumentVersion) {
        self.current_version = version.version;
        self.updated_at = version.uploaded_at;
        self.versions.push(version);
    }

    pub fn version(&self, number: u32) -> Option<&DocumentVersion> {
        self.versions.iter().find(|v| v.version == number)
    }

    pub fn latest(&self) -> Option<&DocumentVersion> {
        self.version(self.current_version)
    }

    /// Removes a version, returning it. `current_version` falls back to the
    /// highest remaining version.
    pub fn remove_version(&mut self, number: u32) -> Option<DocumentVersion> {
        let idx = self.versions.iter().position(|v| v.version == number)?;
        let removed = self.versions.remove(idx);
        self.current_version = self.versions.iter().map(|v| v.version).max().unwrap_or(0);
        self.updated_at = Utc::now();
        Some(removed)
    }

    /// Key used when mirroring this document onto its job.
    pub fn job_key(&self) -> String {
        self.document_key.clone().unwrap_or_else(|| self.id.clone())
    }
}

impl DocumentVersion {
    /// File reference for this version, tagged with the owning document.
    pub fn file_ref(&self, document_id: &str) -> FileRef {
        FileRef {
            file_name: self.file_name.clone(),
            original_name: self.original_name.clone(),
            stored_path: self.stored_path.clone(),
            size: self.size,
            content_type: self.content_type.clone(),
            uploaded_at: Some(self.uploaded_at),
            returned_at: None,
            ticket_id: None,
            document_id: Some(document_id.to_string()),
        }
    }
}

/// Client-supplied metadata accompanying a document upload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadataInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub document_key: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
}
