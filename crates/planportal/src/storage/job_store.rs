//! One JSON file per job under the jobs directory.
//!
//! Layout: `<jobs>/<id>.json` holds the job, `<jobs>/<id>/documents/` the
//! files attached to it. Writes replace the whole file through a temp file
//! and a rename, so readers never see a half-written job.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};

use crate::error::StorageError;
use crate::model::{Job, JobRecord};
use crate::sanitize;

/// Previous bytes of a job file, used to undo a write.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    id: String,
    bytes: Option<Vec<u8>>,
}

pub struct JobStore {
    jobs_dir: PathBuf,
}

impl JobStore {
    pub fn new<P: AsRef<Path>>(jobs_dir: P) -> Self {
        Self {
            jobs_dir: jobs_dir.as_ref().to_path_buf(),
        }
    }

    pub fn jobs_dir(&self) -> &Path {
        &self.jobs_dir
    }

    fn job_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        let id = sanitize::validate_id(id)?;
        Ok(self.jobs_dir.join(format!("{}.json", id)))
    }

    /// Directory holding the job's attached files.
    pub fn job_dir(&self, id: &str) -> Result<PathBuf, StorageError> {
        let id = sanitize::validate_id(id)?;
        Ok(self.jobs_dir.join(id))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.job_path(id).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Overwrites the job file, creating the job directory if absent.
    pub fn save(&self, job: &Job) -> Result<(), StorageError> {
        let content = serde_json::to_vec_pretty(job).map_err(StorageError::Serialize)?;
        self.write(&job.id, &content)
    }

    /// Writes `record` as the job file of `id`, exactly as given.
    pub fn save_record(&self, id: &str, record: &JobRecord) -> Result<(), StorageError> {
        let content = serde_json::to_vec_pretty(record).map_err(StorageError::Serialize)?;
        self.write(id, &content)
    }

    fn write(&self, id: &str, content: &[u8]) -> Result<(), StorageError> {
        let path = self.job_path(id)?;
        let dir = self.job_dir(id)?;
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.clone(),
            source: e,
        })?;
        atomic_write(&path, content)
    }

    fn read(&self, id: &str) -> Result<(PathBuf, Vec<u8>), StorageError> {
        let path = self.job_path(id)?;
        match std::fs::read(&path) {
            Ok(content) => Ok((path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::JobNotFound(id.to_string()))
            }
            Err(e) => Err(StorageError::ReadFile { path, source: e }),
        }
    }

    /// Loads the job into the typed model used by the workflows.
    pub fn get(&self, id: &str) -> Result<Job, StorageError> {
        let (path, content) = self.read(id)?;
        serde_json::from_slice(&content).map_err(|e| StorageError::Parse { path, source: e })
    }

    /// Loads the job file as raw JSON.
    pub fn get_record(&self, id: &str) -> Result<JobRecord, StorageError> {
        let (path, content) = self.read(id)?;
        serde_json::from_slice(&content).map_err(|e| StorageError::Parse { path, source: e })
    }

    /// All job files as raw JSON, newest `createdAt` first. Files that are
    /// not a JSON object are logged and skipped so one bad file does not
    /// hide the rest.
    pub fn list(&self) -> Result<Vec<JobRecord>, StorageError> {
        let entries = match std::fs::read_dir(&self.jobs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::ReadFile {
                    path: self.jobs_dir.clone(),
                    source: e,
                })
            }
        };

        let mut jobs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read(&path).map_err(|e| e.to_string()).and_then(|bytes| {
                serde_json::from_slice::<JobRecord>(&bytes).map_err(|e| e.to_string())
            });
            match parsed {
                Ok(job) => jobs.push(job),
                Err(e) => log::error!(
                    "Skipping unreadable job file {}: {}",
                    sanitize::redact_path(&path),
                    e
                ),
            }
        }

        jobs.sort_by_cached_key(|job| std::cmp::Reverse(created_at(job)));
        Ok(jobs)
    }

    /// Removes the job file and its directory tree. Returns whether the job
    /// existed.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let path = self.job_path(id)?;
        let dir = self.job_dir(id)?;

        let existed = match std::fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(StorageError::Remove { path, source: e }),
        };

        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Remove { path: dir, source: e }),
        }

        Ok(existed)
    }

    /// Captures the current file bytes (or their absence).
    pub fn snapshot(&self, id: &str) -> Result<JobSnapshot, StorageError> {
        let path = self.job_path(id)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(StorageError::ReadFile { path, source: e }),
        };
        Ok(JobSnapshot {
            id: id.to_string(),
            bytes,
        })
    }

    /// Puts a job file back to the state captured by [`JobStore::snapshot`].
    pub fn restore(&self, snapshot: &JobSnapshot) -> Result<(), StorageError> {
        let path = self.job_path(&snapshot.id)?;
        match &snapshot.bytes {
            Some(bytes) => atomic_write(&path, bytes),
            None => match std::fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StorageError::Remove { path, source: e }),
            },
        }
    }
}

/// `createdAt` of a raw job, if it parses. Jobs without one sort last.
fn created_at(job: &JobRecord) -> Option<DateTime<FixedOffset>> {
    job.get("createdAt")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

fn atomic_write(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let temp_path = path.with_extension("json.tmp");

    std::fs::write(&temp_path, content).map_err(|e| StorageError::WriteFile {
        path: temp_path.clone(),
        source: e,
    })?;

    std::fs::rename(&temp_path, path).map_err(|e| StorageError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}
