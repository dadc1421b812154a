use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::sanitize;

/// A file written below the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the data directory, with `/` separators.
    pub relative: String,
    /// Bytes written.
    pub size: u64,
}

pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `content` as `<relative_directory>/<stem>.<extension>`, picking
    /// `<stem>_2`, `<stem>_3`, ... when the name is taken.
    pub fn store(
        &self,
        content: &[u8],
        relative_directory: &str,
        stem: &str,
        extension: Option<&str>,
    ) -> Result<StoredFile, StorageError> {
        let dir_path = sanitize::resolve_relative(&self.root, relative_directory)?;
        self.ensure_directory(&dir_path)?;

        let full_filename = match extension {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem.to_string(),
        };

        let file_path = self.store_with_atomic_creation(&dir_path, &full_filename, content)?;

        Ok(StoredFile {
            relative: self.relative_path(&file_path)?,
            size: content.len() as u64,
            path: file_path,
        })
    }

    /// Copies an already stored file to a new unique name in another directory.
    pub fn copy_into(
        &self,
        source_relative: &str,
        relative_directory: &str,
        stem: &str,
        extension: Option<&str>,
    ) -> Result<StoredFile, StorageError> {
        let source = self.resolve(source_relative)?;
        let content = std::fs::read(&source).map_err(|e| StorageError::ReadFile {
            path: source.clone(),
            source: e,
        })?;
        self.store(&content, relative_directory, stem, extension)
    }

    /// Resolves a stored relative path to an absolute one.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        sanitize::resolve_relative(&self.root, relative)
    }

    /// Removes a stored file. A file that is already gone is not an error.
    pub fn remove(&self, relative: &str) -> Result<(), StorageError> {
        let path = self.resolve(relative)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Remove { path, source: e }),
        }
    }

    /// Removes every file in `relatives`, logging failures instead of
    /// returning them.
    pub fn remove_best_effort<'a>(&self, relatives: impl IntoIterator<Item = &'a str>) {
        for relative in relatives {
            if let Err(e) = self.remove(relative) {
                log::warn!("Failed to remove stored file {}: {}", relative, e);
            }
        }
    }

    fn relative_path(&self, path: &Path) -> Result<String, StorageError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| StorageError::UnsafePath(path.display().to_string()))?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }

    /// Creates the first free candidate name with `create_new`, so two
    /// writers never share a file.
    fn store_with_atomic_creation(
        &self,
        dir_path: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        use std::io::Write;

        for candidate in candidate_names(filename).take(MAX_NAME_ATTEMPTS) {
            let target = dir_path.join(&candidate);
            let opened = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target);
            let mut file = match opened {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StorageError::WriteFile { path: target, source }),
            };
            file.write_all(content)
                .map_err(|source| StorageError::WriteFile {
                    path: target.clone(),
                    source,
                })?;
            return Ok(target);
        }

        Err(StorageError::FileExists(dir_path.join(filename)))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

const MAX_NAME_ATTEMPTS: usize = 1000;

/// `report.pdf`, `report_2.pdf`, `report_3.pdf`, ...
fn candidate_names(filename: &str) -> impl Iterator<Item = String> + '_ {
    let (base, ext) = match filename.rfind('.') {
        Some(dot) => filename.split_at(dot),
        None => (filename, ""),
    };
    std::iter::once(filename.to_string())
        .chain((2..).map(move |n| format!("{}_{}{}", base, n, ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let content = b"Hello, World!";
        let stored = storage
            .store(content, "jobs/job-1/documents", "bushfire_report", Some("pdf"))
            .unwrap();

        assert!(stored.path.exists());
        assert_eq!(stored.relative, "jobs/job-1/documents/bushfire_report.pdf");
        assert_eq!(stored.size, content.len() as u64);
        assert_eq!(std::fs::read(&stored.path).unwrap(), content);
    }

    #[test]
    fn test_store_file_conflict_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let first = storage.store(b"First", "docs", "report", Some("pdf")).unwrap();
        assert!(first.path.ends_with("report.pdf"));

        let second = storage.store(b"Second", "docs", "report", Some("pdf")).unwrap();
        assert!(second.path.ends_with("report_2.pdf"));

        let third = storage.store(b"Third", "docs", "report", Some("pdf")).unwrap();
        assert!(third.path.ends_with("report_3.pdf"));
    }

    #[test]
    fn test_store_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let first = storage.store(b"a", "docs", "notes", None).unwrap();
        let second = storage.store(b"b", "docs", "notes", None).unwrap();

        assert_eq!(first.relative, "docs/notes");
        assert_eq!(second.relative, "docs/notes_2");
    }

    #[test]
    fn test_store_rejects_escaping_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let result = storage.store(b"x", "../outside", "file", Some("txt"));
        assert!(matches!(result, Err(StorageError::UnsafePath(_))));
    }

    #[test]
    fn test_copy_into_creates_unique_copy() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let original = storage
            .store(b"report body", "jobs/j1/documents", "bushfire_report", Some("pdf"))
            .unwrap();
        let copy = storage
            .copy_into(&original.relative, "jobs/j1/documents", "bushfire_report", Some("pdf"))
            .unwrap();

        assert_ne!(original.path, copy.path);
        assert!(copy.relative.ends_with("bushfire_report_2.pdf"));
        assert_eq!(std::fs::read(&copy.path).unwrap(), b"report body");
    }

    #[test]
    fn test_copy_into_missing_source_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let result = storage.copy_into("docs/missing.pdf", "docs", "copy", Some("pdf"));
        match result {
            Err(StorageError::ReadFile { path, .. }) => {
                assert!(path.to_string_lossy().contains("missing.pdf"));
            }
            other => panic!("Expected ReadFile error, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let stored = storage.store(b"x", "docs", "file", Some("txt")).unwrap();
        storage.remove(&stored.relative).unwrap();
        assert!(!stored.path.exists());
        storage.remove(&stored.relative).unwrap();
    }

    #[test]
    fn test_store_empty_content() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let stored = storage.store(&[], "empty", "file", Some("bin")).unwrap();

        assert!(stored.path.exists());
        assert_eq!(stored.size, 0);
        assert!(std::fs::read(&stored.path).unwrap().is_empty());
    }

    #[test]
    fn test_candidate_names_keep_extension() {
        let names: Vec<String> = candidate_names("plan.v2.pdf").take(3).collect();
        assert_eq!(names, ["plan.v2.pdf", "plan.v2_2.pdf", "plan.v2_3.pdf"]);
    }

    #[test]
    fn test_root_accessor() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        assert_eq!(storage.root(), temp_dir.path());
    }
}
