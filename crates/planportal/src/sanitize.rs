//! Helpers for turning user-supplied names into safe path components.
//!
//! Identifiers, categories and uploaded filenames all end up in paths under
//! the data directory; these functions make sure none of them can escape it.

use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Accepts identifiers made of ASCII letters, digits, `-` and `_`.
pub fn validate_id(id: &str) -> Result<&str, StorageError> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id)
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

/// Lowercase, dash-separated form of a category name.
///
/// `"Bushfire"` → `bushfire`, `"Traffic & Parking"` → `traffic-parking`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "uncategorized".to_string()
    } else {
        slug
    }
}

/// Strips any directory components from an uploaded filename.
pub fn safe_file_name(original: &str) -> String {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "document".to_string()
    } else {
        name.to_string()
    }
}

/// Lowercased extension of an uploaded filename, without the dot.
pub fn extension_of(original: &str) -> Option<String> {
    let name = safe_file_name(original);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Resolves a stored relative path against `root`, rejecting anything that
/// is absolute or climbs out with `..`.
pub fn resolve_relative(root: &Path, relative: &str) -> Result<PathBuf, StorageError> {
    let candidate = Path::new(relative);
    let clean = candidate
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if relative.is_empty() || !clean {
        return Err(StorageError::UnsafePath(relative.to_string()));
    }
    Ok(root.join(candidate))
}
