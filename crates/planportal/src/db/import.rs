//! One-time import of the JSON array files older deployments kept under the
//! data directory.
//!
//! A file is imported only while its table is still empty. After a
//! successful import it is renamed to `<name>.imported` so the next start
//! leaves it alone. Records that fail to decode are logged and skipped;
//! a file that is not a JSON array is left in place untouched.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{consultant_repo, document_repo, kb_repo, ticket_repo, Database, DatabaseError};
use crate::model::{Consultant, ConsultantTicket, Document, KbKind, KbSection, WorkTicket};
use crate::sanitize;
use crate::storage::DataPaths;

/// Records imported per legacy file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub documents: usize,
    pub consultant_tickets: usize,
    pub work_tickets: usize,
    pub consultants: usize,
    pub kb_sections: usize,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.documents
            + self.consultant_tickets
            + self.work_tickets
            + self.consultants
            + self.kb_sections
    }
}

/// Imports every legacy file whose table is empty.
pub fn import_legacy(db: &Database, paths: &DataPaths) -> Result<ImportReport, DatabaseError> {
    let mut report = ImportReport::default();

    report.documents = import_file(
        db,
        &paths.legacy_document_metadata(),
        document_repo::count,
        |conn, doc: &Document| document_repo::upsert(conn, doc),
    )?;
    report.consultant_tickets = import_file(
        db,
        &paths.legacy_consultant_tickets(),
        ticket_repo::count_consultant,
        |conn, ticket: &ConsultantTicket| ticket_repo::upsert_consultant(conn, ticket),
    )?;
    report.work_tickets = import_file(
        db,
        &paths.legacy_work_tickets(),
        ticket_repo::count_work,
        |conn, ticket: &WorkTicket| ticket_repo::upsert_work(conn, ticket),
    )?;
    report.consultants = import_file(
        db,
        &paths.legacy_consultants(),
        consultant_repo::count,
        |conn, consultant: &Consultant| consultant_repo::upsert(conn, consultant),
    )?;
    for kind in KbKind::ALL {
        report.kb_sections += import_file(
            db,
            &paths.legacy_kb(kind),
            |conn| kb_repo::count_sections(conn, kind),
            |conn, section: &KbSection| insert_kb_section(conn, kind, section),
        )?;
    }

    if report.total() > 0 {
        log::info!("Imported legacy records: {:?}", report);
    }
    Ok(report)
}

fn insert_kb_section(
    conn: &Connection,
    kind: KbKind,
    section: &KbSection,
) -> Result<(), DatabaseError> {
    kb_repo::insert_section(conn, kind, &section.id, &section.title)?;
    for article in &section.assessments {
        kb_repo::upsert_article(conn, kind, &section.id, article)?;
    }
    Ok(())
}

fn import_file<T, C, I>(
    db: &Database,
    path: &Path,
    count: C,
    insert: I,
) -> Result<usize, DatabaseError>
where
    T: DeserializeOwned,
    C: Fn(&Connection) -> Result<u64, DatabaseError>,
    I: Fn(&Connection, &T) -> Result<(), DatabaseError>,
{
    if !path.is_file() {
        return Ok(0);
    }

    let records = match read_array(path) {
        Ok(records) => records,
        Err(reason) => {
            log::error!(
                "Leaving legacy file {} in place: {}",
                sanitize::redact_path(path),
                reason
            );
            return Ok(0);
        }
    };

    let imported = db.with_conn(|conn| {
        if count(conn)? > 0 {
            log::warn!(
                "Table already populated, not importing {}",
                sanitize::redact_path(path)
            );
            return Ok(None);
        }

        let tx = conn.unchecked_transaction()?;
        let mut imported = 0;
        for (index, raw) in records.into_iter().enumerate() {
            match serde_json::from_value::<T>(raw) {
                Ok(record) => {
                    insert(&*tx, &record)?;
                    imported += 1;
                }
                Err(e) => log::warn!(
                    "Skipping record {} of {}: {}",
                    index,
                    sanitize::redact_path(path),
                    e
                ),
            }
        }
        tx.commit()?;
        Ok::<_, DatabaseError>(Some(imported))
    })?;

    let Some(imported) = imported else {
        return Ok(0);
    };

    let target = imported_path(path);
    std::fs::rename(path, &target).map_err(|e| DatabaseError::Io {
        path: target,
        source: e,
    })?;
    log::info!(
        "Imported {} record(s) from {}",
        imported,
        sanitize::redact_path(path)
    );
    Ok(imported)
}

fn read_array(path: &Path) -> Result<Vec<Value>, String> {
    let content = std::fs::read(path).map_err(|e| e.to_string())?;
    match serde_json::from_slice::<Value>(&content).map_err(|e| e.to_string())? {
        Value::Array(records) => Ok(records),
        _ => Err("expected a JSON array".to_string()),
    }
}

fn imported_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".imported");
    path.with_file_name(name)
}
