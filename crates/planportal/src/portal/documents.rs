use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;

use crate::db::document_repo::{self, DocumentFilter};
use crate::error::{PortalError, Result, StorageError};
use crate::model::{Document, DocumentMetadataInput, DocumentVersion, Job, JobDocument};
use crate::sanitize;

use super::{ChangeSet, Portal, Upload, DEFAULT_UPLOADER};

/// Category given to documents uploaded without one.
const DEFAULT_CATEGORY: &str = "general";

/// Editable document fields. Files are not moved when the category
/// changes; each version keeps its stored path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl Portal {
    pub fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        Ok(self.db.with_conn(|conn| document_repo::list(conn, filter))?)
    }

    pub fn get_document(&self, id: &str) -> Result<Document> {
        self.db
            .with_conn(|conn| document_repo::find(conn, id))?
            .ok_or_else(|| PortalError::not_found("Document", id))
    }

    /// Creates a document with `upload` as version 1. When `jobId` is set
    /// the job must exist and gets the document under `documents[key]`.
    pub fn create_document(
        &self,
        meta: DocumentMetadataInput,
        upload: Option<Upload>,
    ) -> Result<Document> {
        let upload = upload.ok_or(PortalError::MissingField("file"))?;
        let title = non_empty(meta.title)
            .unwrap_or_else(|| sanitize::safe_file_name(&upload.file_name));
        let category = non_empty(meta.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let path = non_empty(meta.path).unwrap_or_else(|| "/".to_string());
        let uploaded_by = non_empty(meta.uploaded_by).unwrap_or_else(|| DEFAULT_UPLOADER.to_string());

        let _guard = self.lock();
        let mut job = match meta.job_id.as_deref() {
            Some(job_id) => Some(self.jobs.get(job_id)?),
            None => None,
        };

        let mut doc = Document::new(title, path, category);
        doc.job_id = meta.job_id;
        doc.document_key = non_empty(meta.document_key);

        let mut changes = ChangeSet::new();
        let version = self.store_version(&mut changes, &doc, &upload, &uploaded_by, Utc::now())?;
        doc.push_version(version);
        doc.created_at = doc.updated_at;

        if let Some(job) = job.as_mut() {
            mirror_on_job(job, &doc);
        }
        stage_document(&mut changes, job, &doc);
        self.commit(changes)?;

        log::info!(
            "Created document {} ({}) in {}",
            doc.id,
            doc.title,
            doc.category
        );
        Ok(doc)
    }

    /// Appends `upload` as the next version of document `id`.
    pub fn add_version(
        &self,
        id: &str,
        upload: Upload,
        uploaded_by: Option<String>,
    ) -> Result<Document> {
        let uploaded_by = non_empty(uploaded_by).unwrap_or_else(|| DEFAULT_UPLOADER.to_string());

        let _guard = self.lock();
        let mut doc = self.get_document(id)?;
        let mut job = self.owning_job(&doc)?;

        let mut changes = ChangeSet::new();
        let version = self.store_version(&mut changes, &doc, &upload, &uploaded_by, Utc::now())?;
        doc.push_version(version);

        if let Some(job) = job.as_mut() {
            mirror_on_job(job, &doc);
        }
        stage_document(&mut changes, job, &doc);
        self.commit(changes)?;

        log::info!("Document {} is now at version {}", doc.id, doc.current_version);
        Ok(doc)
    }

    pub fn update_document(&self, id: &str, update: DocumentUpdate) -> Result<Document> {
        let _guard = self.lock();
        let mut doc = self.get_document(id)?;

        if let Some(title) = non_empty(update.title) {
            doc.title = title;
        }
        if let Some(path) = update.path {
            doc.path = path;
        }
        if let Some(category) = non_empty(update.category) {
            doc.category = category;
        }
        doc.updated_at = Utc::now();

        let mut job = self.owning_job(&doc)?;
        if let Some(job) = job.as_mut() {
            if let Some(entry) = mirrored_entry(job, &doc) {
                entry.title = doc.title.clone();
                entry.category = doc.category.clone();
            }
        }

        let mut changes = ChangeSet::new();
        stage_document(&mut changes, job, &doc);
        self.commit(changes)?;
        Ok(doc)
    }

    /// Deletes the record and, after the commit, every version file. File
    /// removal failures are logged only.
    pub fn delete_document(&self, id: &str) -> Result<()> {
        let _guard = self.lock();
        let doc = self.get_document(id)?;
        let mut job = self.owning_job(&doc)?;

        let mut changes = ChangeSet::new();
        changes.remove_document(&doc.id);
        for version in &doc.versions {
            changes.discard_file(&version.stored_path);
        }
        if let Some(mut job) = job.take() {
            if unmirror_from_job(&mut job, &doc) {
                changes.put_job(job);
            }
        }
        self.commit(changes)?;

        log::info!("Deleted document {} with {} version(s)", doc.id, doc.versions.len());
        Ok(())
    }

    /// Removes one version. `currentVersion` falls back to the highest
    /// remaining version, or 0 when none is left.
    pub fn delete_version(&self, id: &str, version: u32) -> Result<Document> {
        let _guard = self.lock();
        let mut doc = self.get_document(id)?;
        let removed = doc.remove_version(version).ok_or_else(|| {
            PortalError::not_found("Document version", format!("{} v{}", id, version))
        })?;
        let mut job = self.owning_job(&doc)?;

        let mut changes = ChangeSet::new();
        changes.discard_file(&removed.stored_path);
        if let Some(job) = job.as_mut() {
            mirror_on_job(job, &doc);
        }
        stage_document(&mut changes, job, &doc);
        self.commit(changes)?;

        log::info!("Deleted version {} of document {}", version, doc.id);
        Ok(doc)
    }

    /// A document version (latest when `version` is `None`) and its file.
    pub fn document_file(
        &self,
        id: &str,
        version: Option<u32>,
    ) -> Result<(DocumentVersion, PathBuf)> {
        let doc = self.get_document(id)?;
        let found = match version {
            Some(n) => doc.version(n),
            None => doc.latest(),
        }
        .cloned()
        .ok_or_else(|| {
            PortalError::not_found(
                "Document version",
                format!("{} v{}", id, version.unwrap_or(doc.current_version)),
            )
        })?;

        let path = self.files.resolve(&found.stored_path)?;
        if !path.is_file() {
            log::warn!("Document {} version {} has no file on disk", id, found.version);
            return Err(PortalError::not_found("File", found.file_name.clone()));
        }
        Ok((found, path))
    }

    /// The job a document is scoped to. A job that no longer exists is
    /// logged and treated as absent.
    fn owning_job(&self, doc: &Document) -> Result<Option<Job>> {
        let Some(job_id) = doc.job_id.as_deref() else {
            return Ok(None);
        };
        match self.jobs.get(job_id) {
            Ok(job) => Ok(Some(job)),
            Err(StorageError::JobNotFound(_)) => {
                log::warn!("Document {} refers to missing job {}", doc.id, job_id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn stage_document(changes: &mut ChangeSet, job: Option<Job>, doc: &Document) {
    if let Some(job) = job {
        changes.put_job(job);
    }
    changes.put_document(doc.clone());
}

/// The `job.documents` entry pointing at `doc`, if any.
fn mirrored_entry<'a>(job: &'a mut Job, doc: &Document) -> Option<&'a mut JobDocument> {
    job.documents
        .get_mut(&doc.job_key())
        .filter(|entry| entry.file.document_id.as_deref() == Some(doc.id.as_str()))
}

/// Points `job.documents[key]` at the latest version of `doc`, or drops
/// the entry when no version is left.
fn mirror_on_job(job: &mut Job, doc: &Document) {
    match doc.latest() {
        Some(latest) => {
            job.documents.insert(
                doc.job_key(),
                JobDocument {
                    title: doc.title.clone(),
                    category: doc.category.clone(),
                    version: Some(latest.version),
                    file: latest.file_ref(&doc.id),
                },
            );
        }
        None => {
            unmirror_from_job(job, doc);
        }
    }
}

/// Removes the entry for `doc`. Entries since replaced by another document
/// are left alone. Returns whether anything was removed.
fn unmirror_from_job(job: &mut Job, doc: &Document) -> bool {
    if mirrored_entry(job, doc).is_none() {
        return false;
    }
    job.documents.remove(&doc.job_key()).is_some()
}
