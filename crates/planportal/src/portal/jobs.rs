use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::db::document_repo;
use crate::error::{PortalError, Result};
use crate::model::{
    merge_patch, promote_legacy_completed_document, Job, JobDocument, JobRecord, PropertyData,
};
use crate::planning::derive_council;

use super::{ChangeSet, Portal};

/// Property-search output submitted to open a job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub property_data: Option<PropertyData>,
    #[serde(default)]
    pub council: Option<String>,
    #[serde(default)]
    pub current_stage: Option<String>,
    /// Anything else the client sends is stored on the job.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Portal {
    /// Every stored job as written, newest first.
    pub fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        Ok(self.jobs.list()?)
    }

    /// Opens a job. The council comes from the request, else from the
    /// property's LEP layer, else stays empty.
    pub fn create_job(&self, input: NewJob) -> Result<Job> {
        let address = input
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(PortalError::MissingField("address"))?
            .to_string();

        let council = input
            .council
            .filter(|c| !c.trim().is_empty())
            .or_else(|| input.property_data.as_ref().and_then(derive_council))
            .unwrap_or_default();

        let mut job: Job = serde_json::from_value(Value::Object(input.extra))
            .map_err(|e| PortalError::invalid(format!("Invalid job fields: {}", e)))?;
        let fresh = Job::new(address, council);
        job.id = fresh.id;
        job.address = fresh.address;
        job.council = fresh.council;
        job.created_at = fresh.created_at;
        job.updated_at = None;
        job.current_stage = input.current_stage.or(fresh.current_stage);
        job.property_data = input.property_data;

        let _span = tracing::info_span!("create_job", job_id = %job.id).entered();
        let _guard = self.lock();
        let mut changes = ChangeSet::new();
        changes.put_job(job.clone());
        self.commit(changes)?;

        if job.council.is_empty() {
            log::warn!("Created job {} without a council for {}", job.id, job.address);
        } else {
            log::info!("Created job {} ({}) for {}", job.id, job.council, job.address);
        }
        Ok(job)
    }

    /// Loads a job into the typed model.
    pub fn get_job(&self, id: &str) -> Result<Job> {
        Ok(self.jobs.get(id)?)
    }

    /// Reads a job as stored. Legacy top-level `completedDocument` data is
    /// promoted into the statement of environmental effects in the returned
    /// value only; the file is left as stored.
    pub fn job_record(&self, id: &str) -> Result<JobRecord> {
        let mut job = self.jobs.get_record(id)?;
        if promote_legacy_completed_document(&mut job) {
            log::debug!("Promoted legacy completed document on job {}", id);
        }
        Ok(job)
    }

    /// Replaces the stored job with `body` as given, creating it when
    /// absent. The id in the path wins over any id in the body.
    pub fn replace_job(&self, id: &str, body: Value) -> Result<JobRecord> {
        let Value::Object(mut job) = body else {
            return Err(PortalError::invalid("Job body must be a JSON object"));
        };
        job.insert("id".to_string(), Value::String(id.to_string()));

        let _guard = self.lock();
        self.jobs.save_record(id, &job)?;
        log::info!("Replaced job {}", id);
        Ok(job)
    }

    /// Merges `patch` into the stored job. See [`merge_patch`].
    pub fn patch_job(&self, id: &str, patch: Map<String, Value>) -> Result<JobRecord> {
        let _guard = self.lock();
        let mut job = self.jobs.get_record(id)?;
        let fields: Vec<String> = patch.keys().cloned().collect();
        merge_patch(&mut job, patch);

        self.jobs.save_record(id, &job)?;
        log::debug!("Patched job {} fields {:?}", id, fields);
        Ok(job)
    }

    /// Deletes the job file, its directory and the document records scoped
    /// to it. Version files of those records are removed best-effort.
    pub fn delete_job(&self, id: &str) -> Result<()> {
        let _span = tracing::info_span!("delete_job", job_id = %id).entered();
        let _guard = self.lock();
        if !self.jobs.exists(id) {
            return Err(PortalError::not_found("Job", id));
        }

        let removed = self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let removed = document_repo::delete_for_job(&tx, id)?;
            self.jobs.delete(id)?;
            tx.commit()?;
            Ok::<_, PortalError>(removed)
        })?;

        self.files.remove_best_effort(
            removed
                .iter()
                .flat_map(|doc| doc.versions.iter())
                .map(|v| v.stored_path.as_str()),
        );
        log::info!(
            "Deleted job {} with {} document record(s)",
            id,
            removed.len()
        );
        Ok(())
    }

    /// A file listed under `job.documents[key]` and its location on disk.
    pub fn job_document(&self, id: &str, key: &str) -> Result<(JobDocument, PathBuf)> {
        let job = self.get_job(id)?;
        let doc = job
            .documents
            .get(key)
            .cloned()
            .ok_or_else(|| PortalError::not_found("Job document", key))?;
        if doc.file.stored_path.is_empty() {
            log::warn!("Job {} lists document {} without a stored path", id, key);
            return Err(PortalError::not_found("File", doc.file.file_name.clone()));
        }
        let path = self.files.resolve(&doc.file.stored_path)?;
        if !path.is_file() {
            log::warn!(
                "Job {} lists document {} but {} is missing",
                id,
                key,
                doc.file.stored_path
            );
            return Err(PortalError::not_found("File", doc.file.file_name.clone()));
        }
        Ok((doc, path))
    }
}
