//! Knowledge-base repository: sections and their articles, one set per
//! [`KbKind`].

use rusqlite::{params, Connection, OptionalExtension};

use super::{decode, encode, query_records, DatabaseError};
use crate::model::{KbArticle, KbKind, KbSection};

/// Every section of `kind` with its articles, in insertion order.
pub fn list_sections(conn: &Connection, kind: KbKind) -> Result<Vec<KbSection>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, title FROM kb_sections WHERE kind = ?1 ORDER BY position, id",
    )?;
    let headers = stmt
        .query_map(params![kind.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut sections = Vec::with_capacity(headers.len());
    for (id, title) in headers {
        let assessments = query_records(
            conn,
            "SELECT data FROM kb_articles WHERE kind = ?1 AND section_id = ?2 ORDER BY position, id",
            params![kind.as_str(), id],
        )?;
        sections.push(KbSection {
            id,
            title,
            assessments,
        });
    }
    Ok(sections)
}

/// Section id with the given title, if one exists.
pub fn find_section_by_title(
    conn: &Connection,
    kind: KbKind,
    title: &str,
) -> Result<Option<String>, DatabaseError> {
    let id = conn
        .query_row(
            "SELECT id FROM kb_sections WHERE kind = ?1 AND title = ?2 ORDER BY position LIMIT 1",
            params![kind.as_str(), title],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn section_exists(conn: &Connection, kind: KbKind, id: &str) -> Result<bool, DatabaseError> {
    let found: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM kb_sections WHERE kind = ?1 AND id = ?2)",
        params![kind.as_str(), id],
        |r| r.get(0),
    )?;
    Ok(found)
}

/// Appends an empty section after the existing ones.
pub fn insert_section(
    conn: &Connection,
    kind: KbKind,
    id: &str,
    title: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO kb_sections (kind, id, title, position)
         VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(position), 0) + 1 FROM kb_sections WHERE kind = ?1))",
        params![kind.as_str(), id, title],
    )?;
    Ok(())
}

/// Inserts an article at the end of `section_id`, or replaces it in place
/// when the id already exists.
pub fn upsert_article(
    conn: &Connection,
    kind: KbKind,
    section_id: &str,
    article: &KbArticle,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO kb_articles (kind, id, section_id, position, data)
         VALUES (?1, ?2, ?3,
           (SELECT COALESCE(MAX(position), 0) + 1 FROM kb_articles WHERE kind = ?1 AND section_id = ?3),
           ?4)
         ON CONFLICT(kind, id) DO UPDATE SET data = ?4",
        params![kind.as_str(), article.id, section_id, encode(article)?],
    )?;
    Ok(())
}

/// An article and the id of the section holding it.
pub fn find_article(
    conn: &Connection,
    kind: KbKind,
    id: &str,
) -> Result<Option<(String, KbArticle)>, DatabaseError> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT section_id, data FROM kb_articles WHERE kind = ?1 AND id = ?2",
            params![kind.as_str(), id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    match row {
        Some((section_id, data)) => Ok(Some((section_id, decode(&data)?))),
        None => Ok(None),
    }
}

/// Deletes an article. Returns whether a row was removed.
pub fn delete_article(conn: &Connection, kind: KbKind, id: &str) -> Result<bool, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM kb_articles WHERE kind = ?1 AND id = ?2",
        params![kind.as_str(), id],
    )?;
    Ok(removed > 0)
}

/// Number of sections stored for `kind`.
pub fn count_sections(conn: &Connection, kind: KbKind) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM kb_sections WHERE kind = ?1",
        params![kind.as_str()],
        |r| r.get(0),
    )?;
    Ok(count)
}
