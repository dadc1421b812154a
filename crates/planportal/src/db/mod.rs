//! SQLite tables for documents, tickets, consultants and the knowledge base.
//!
//! Each table keeps the columns it is queried by plus the full record as a
//! JSON `data` column, so records can grow fields without a migration.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql};

pub mod consultant_repo;
pub mod document_repo;
pub mod error;
pub mod import;
pub mod kb_repo;
pub mod migrations;
pub mod ticket_repo;

pub use error::DatabaseError;

/// Shared handle to the portal database. Clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates the database file in WAL mode and brings its schema
    /// up to date.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self::prepare(conn)?;

        log::info!(
            "Database {} ready (journal {}, schema v{})",
            crate::sanitize::redact_path(path),
            mode,
            migrations::latest_version()
        );
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, DatabaseError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with exclusive use of the connection.
    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Encodes a record for the `data` column.
pub(crate) fn encode<T: serde::Serialize>(record: &T) -> Result<String, DatabaseError> {
    Ok(serde_json::to_string(record)?)
}

/// Decodes a `data` column value.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(data: &str) -> Result<T, DatabaseError> {
    Ok(serde_json::from_str(data)?)
}

/// Fixed-width RFC 3339 so timestamp columns sort lexically.
pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Runs a query whose first column is `data` and decodes every row.
pub(crate) fn query_records<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<T>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
    let mut records = Vec::new();
    for data in rows {
        records.push(decode(&data?)?);
    }
    Ok(records)
}

/// Like [`query_records`] for at most one row.
pub(crate) fn query_record<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Option<T>, DatabaseError> {
    let data: Option<String> = conn
        .query_row(sql, params, |row| row.get(0))
        .optional()?;
    data.map(|d| decode(&d)).transpose()
}

/// Number of rows in `table`.
pub(crate) fn count_rows(conn: &Connection, table: &str) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
        r.get(0)
    })?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_is_migrated() {
        let db = Database::open_in_memory().unwrap();
        let version = db
            .with_conn(migrations::schema_version)
            .unwrap();
        assert_eq!(version, migrations::latest_version());
    }

    #[test]
    fn test_open_creates_parent_and_enables_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("portal.db");
        let db = Database::open(&path).unwrap();
        let mode: String = db
            .with_conn(|conn| {
                conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))
                    .map_err(DatabaseError::from)
            })
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert!(path.exists());
    }

    #[test]
    fn test_timestamp_is_fixed_width() {
        use chrono::TimeZone;
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(timestamp(&at), "2024-05-01T09:30:00.000Z");
    }

    #[test]
    fn test_query_record_decodes_data_column() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO consultants (id, category, created_at, data) VALUES ('c1', 'Bushfire', '2026-01-01', '{\"name\":\"Ember\"}')",
                [],
            )?;
            let found: Option<serde_json::Value> = query_record(
                conn,
                "SELECT data FROM consultants WHERE id = ?1",
                rusqlite::params!["c1"],
            )?;
            assert_eq!(found.unwrap()["name"], "Ember");
            let missing: Option<serde_json::Value> = query_record(
                conn,
                "SELECT data FROM consultants WHERE id = ?1",
                rusqlite::params!["c2"],
            )?;
            assert!(missing.is_none());
            assert_eq!(count_rows(conn, "consultants")?, 1);
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_corrupt_data_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let result = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO consultants (id, category, created_at, data) VALUES ('c1', 'Bushfire', '2026-01-01', '{broken')",
                [],
            )?;
            query_records::<serde_json::Value>(conn, "SELECT data FROM consultants", &[])
        });
        assert!(matches!(result, Err(DatabaseError::Record(_))));
    }

    #[test]
    fn test_database_is_clone() {
        let db = Database::open_in_memory().unwrap();
        let db2 = db.clone();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO consultants (id, category, created_at, data) VALUES ('c1', 'Bushfire', '2026-01-01', '{}')",
                [],
            )?;
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
        db2.with_conn(|conn| {
            let count: u32 =
                conn.query_row("SELECT COUNT(*) FROM consultants", [], |r| r.get(0))?;
            assert_eq!(count, 1);
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }
}
