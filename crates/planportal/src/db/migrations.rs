//! Schema migrations for the record tables.
//!
//! The applied level is kept in SQLite's `user_version` pragma. Each
//! pending migration runs in its own transaction together with the bump of
//! that pragma.

use rusqlite::Connection;

use super::error::DatabaseError;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
    /// Skip the SQL when this `(table, column)` already exists.
    unless_column: Option<(&'static str, &'static str)>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "documents",
        sql: include_str!("sql/001_create_documents.sql"),
        unless_column: None,
    },
    Migration {
        version: 2,
        name: "consultant_tickets",
        sql: include_str!("sql/002_create_consultant_tickets.sql"),
        unless_column: None,
    },
    Migration {
        version: 3,
        name: "work_tickets",
        sql: include_str!("sql/003_create_work_tickets.sql"),
        unless_column: None,
    },
    Migration {
        version: 4,
        name: "consultants",
        sql: include_str!("sql/004_create_consultants.sql"),
        unless_column: None,
    },
    Migration {
        version: 5,
        name: "knowledge_base",
        sql: include_str!("sql/005_create_kb.sql"),
        unless_column: None,
    },
    Migration {
        version: 6,
        name: "consultant_ticket_consultant_id",
        sql: include_str!("sql/006_add_consultant_ticket_consultant_id.sql"),
        unless_column: Some(("consultant_tickets", "consultant_id")),
    },
];

/// Highest migration the schema has reached.
pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Applies every migration above the current `user_version`.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    let current = schema_version(conn)?;
    if current > latest_version() {
        log::warn!(
            "Database schema version {} is newer than this build ({})",
            current,
            latest_version()
        );
        return Ok(());
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        apply(conn, migration).map_err(|source| DatabaseError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        })?;
    }
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    let present = match migration.unless_column {
        Some((table, column)) => column_exists(&tx, table, column)?,
        None => false,
    };
    if present {
        log::debug!("Schema migration {} already in place", migration.name);
    } else {
        tx.execute_batch(migration.sql)?;
        log::info!(
            "Applied schema migration {} ({})",
            migration.version,
            migration.name
        );
    }
    tx.pragma_update(None, "user_version", migration.version)?;
    tx.commit()
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        rusqlite::params![table, column],
        |row| row.get::<_, u32>(0),
    )
    .map(|n| n > 0)
}
