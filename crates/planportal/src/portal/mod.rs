//! The portal's workflow service.
//!
//! [`Portal`] owns every store and is the only component that mutates them.
//! Each mutating operation holds the commit gate for its whole
//! read-modify-write cycle and writes through a [`ChangeSet`], so the ticket
//! tables, the job file and the document table change together or not at
//! all.

mod changeset;
mod consultants;
mod documents;
mod jobs;
mod kb;
mod tickets;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::db::import::import_legacy;
use crate::db::Database;
use crate::error::StorageError;
use crate::model::{Document, DocumentVersion};
use crate::sanitize;
use crate::storage::{DataPaths, FileStorage, JobStore};

pub use changeset::ChangeSet;
pub use documents::DocumentUpdate;
pub use jobs::NewJob;

/// A file received with a request.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name the client gave the file.
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Declared content type, else one guessed from the file name.
    pub fn content_type(&self) -> Option<String> {
        self.content_type
            .clone()
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first()
                    .map(|m| m.essence_str().to_string())
            })
    }

    pub fn extension(&self) -> Option<String> {
        sanitize::extension_of(&self.file_name)
    }
}

pub struct Portal {
    paths: DataPaths,
    jobs: JobStore,
    files: FileStorage,
    db: Database,
    gate: Mutex<()>,
}

impl Portal {
    pub fn new(paths: DataPaths, db: Database) -> Self {
        Self {
            jobs: JobStore::new(paths.jobs_dir()),
            files: FileStorage::new(paths.root()),
            paths,
            db,
            gate: Mutex::new(()),
        }
    }

    /// Opens the portal rooted at `data_dir`: creates the directory layout,
    /// opens the database and imports any legacy JSON collections.
    pub fn open(data_dir: &Path) -> crate::Result<Self> {
        let paths = DataPaths::new(data_dir);
        paths
            .ensure()
            .map_err(|source| StorageError::CreateDirectory {
                path: data_dir.to_path_buf(),
                source,
            })?;
        let db = Database::open(&paths.database())?;

        let report = import_legacy(&db, &paths)?;
        if report.total() > 0 {
            log::info!("Imported legacy records: {:?}", report);
        }
        Ok(Self::new(paths, db))
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Serializes read-modify-write cycles. Poisoning is ignored since a
    /// failed commit has already rolled back.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Writes `upload` as the next version of `doc` under
    /// `documents/<category>/<docId>_v<n><ext>` and stages the file.
    fn store_version(
        &self,
        changes: &mut ChangeSet,
        doc: &Document,
        upload: &Upload,
        uploaded_by: &str,
        at: DateTime<Utc>,
    ) -> crate::Result<DocumentVersion> {
        let version = doc.next_version();
        let stored = self.files.store(
            &upload.bytes,
            &DataPaths::category_documents_relative(&doc.category),
            &format!("{}_v{}", doc.id, version),
            upload.extension().as_deref(),
        )?;
        changes.stage_file(&stored.relative);

        Ok(DocumentVersion {
            version,
            file_name: file_name_of(&stored.relative),
            original_name: upload.file_name.clone(),
            size: stored.size,
            content_type: upload.content_type(),
            uploaded_by: uploaded_by.to_string(),
            uploaded_at: at,
            stored_path: stored.relative,
        })
    }
}

/// Last segment of a `/`-separated relative path.
fn file_name_of(relative: &str) -> String {
    relative.rsplit('/').next().unwrap_or(relative).to_string()
}

/// Default uploader recorded when a request names none.
const DEFAULT_UPLOADER: &str = "admin";
