//! Every location under the data directory, resolved once at startup.

use std::path::{Path, PathBuf};

use crate::model::KbKind;
use crate::sanitize;

#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.root.join("documents")
    }

    pub fn database(&self) -> PathBuf {
        self.root.join("portal.db")
    }

    /// `jobs/<id>/documents`, relative to the root.
    pub fn job_documents_relative(job_id: &str) -> String {
        format!("jobs/{}/documents", job_id)
    }

    /// `documents/<category-slug>`, relative to the root.
    pub fn category_documents_relative(category: &str) -> String {
        format!("documents/{}", sanitize::slugify(category))
    }

    /// `kb/<kind>`, relative to the root.
    pub fn kb_relative(kind: KbKind) -> String {
        format!("kb/{}", kind.as_str())
    }

    pub fn legacy_document_metadata(&self) -> PathBuf {
        self.documents_dir().join("metadata.json")
    }

    pub fn legacy_consultant_tickets(&self) -> PathBuf {
        self.root.join("consultant-tickets.json")
    }

    pub fn legacy_work_tickets(&self) -> PathBuf {
        self.root.join("work-tickets.json")
    }

    pub fn legacy_consultants(&self) -> PathBuf {
        self.root.join("consultants.json")
    }

    pub fn legacy_kb(&self, kind: KbKind) -> PathBuf {
        self.root.join(format!("{}.json", kind.collection()))
    }

    /// Creates the directories the portal writes into.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.jobs_dir())?;
        std::fs::create_dir_all(self.documents_dir())?;
        std::fs::create_dir_all(self.root.join("kb"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = DataPaths::new("/srv/portal");
        assert_eq!(paths.jobs_dir(), PathBuf::from("/srv/portal/jobs"));
        assert_eq!(paths.database(), PathBuf::from("/srv/portal/portal.db"));
        assert_eq!(
            paths.legacy_document_metadata(),
            PathBuf::from("/srv/portal/documents/metadata.json")
        );
        assert_eq!(
            paths.legacy_kb(KbKind::Cdc),
            PathBuf::from("/srv/portal/kb-cdc-assessments.json")
        );
    }

    #[test]
    fn test_relative_helpers() {
        assert_eq!(DataPaths::job_documents_relative("j1"), "jobs/j1/documents");
        assert_eq!(
            DataPaths::category_documents_relative("Traffic & Parking"),
            "documents/traffic-parking"
        );
        assert_eq!(DataPaths::kb_relative(KbKind::PrePrepared), "kb/pre-prepared");
    }

    #[test]
    fn test_ensure_creates_directories() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let paths = DataPaths::new(temp_dir.path().join("data"));
        paths.ensure().unwrap();
        assert!(paths.jobs_dir().is_dir());
        assert!(paths.documents_dir().is_dir());
    }
}
