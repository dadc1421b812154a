//! Document repository: version-tracked document records.

use rusqlite::{params, Connection, ToSql};

use super::{count_rows, encode, query_record, query_records, timestamp, DatabaseError};
use crate::model::Document;

/// Query filter parameters for document listing.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Inserts a document or replaces the stored record.
pub fn upsert(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, job_id, category, created_at, updated_at, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           job_id = ?2,
           category = ?3,
           updated_at = ?5,
           data = ?6",
        params![
            doc.id,
            doc.job_id,
            doc.category,
            timestamp(&doc.created_at),
            timestamp(&doc.updated_at),
            encode(doc)?,
        ],
    )?;
    Ok(())
}

/// Finds a document by its ID.
pub fn find(conn: &Connection, id: &str) -> Result<Option<Document>, DatabaseError> {
    query_record(conn, "SELECT data FROM documents WHERE id = ?1", params![id])
}

/// Lists documents matching the filter, newest first.
pub fn list(conn: &Connection, filter: &DocumentFilter) -> Result<Vec<Document>, DatabaseError> {
    let mut conditions = Vec::new();
    let mut param_values: Vec<&dyn ToSql> = Vec::new();

    if let Some(ref job_id) = filter.job_id {
        conditions.push(format!("job_id = ?{}", param_values.len() + 1));
        param_values.push(job_id);
    }
    if let Some(ref category) = filter.category {
        conditions.push(format!("category = ?{}", param_values.len() + 1));
        param_values.push(category);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT data FROM documents {} ORDER BY created_at DESC, id",
        where_clause
    );
    query_records(conn, &sql, &param_values)
}

/// Deletes a document record. Returns whether a row was removed.
pub fn delete(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let removed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

/// Deletes every document scoped to `job_id`, returning the removed records.
pub fn delete_for_job(conn: &Connection, job_id: &str) -> Result<Vec<Document>, DatabaseError> {
    let removed: Vec<Document> = query_records(
        conn,
        "SELECT data FROM documents WHERE job_id = ?1",
        params![job_id],
    )?;
    conn.execute("DELETE FROM documents WHERE job_id = ?1", params![job_id])?;
    Ok(removed)
}

pub fn count(conn: &Connection) -> Result<u64, DatabaseError> {
    count_rows(conn, "documents")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::{Duration, Utc};

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_doc(title: &str, job_id: Option<&str>) -> Document {
        let mut doc = Document::new(title, "/reports", "Reports");
        doc.job_id = job_id.map(str::to_string);
        doc
    }

    #[test]
    fn test_upsert_and_find() {
        let db = test_db();
        let doc = sample_doc("Site Plan", None);
        db.with_conn(|conn| {
            upsert(conn, &doc)?;
            assert_eq!(find(conn, &doc.id)?, Some(doc.clone()));
            assert_eq!(find(conn, "missing")?, None);
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_upsert_replaces_record() {
        let db = test_db();
        let mut doc = sample_doc("Site Plan", None);
        db.with_conn(|conn| {
            upsert(conn, &doc)?;
            doc.title = "Revised Site Plan".to_string();
            upsert(conn, &doc)?;
            assert_eq!(count(conn)?, 1);
            assert_eq!(find(conn, &doc.id)?.unwrap().title, "Revised Site Plan");
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_list_filters_and_orders() {
        let db = test_db();
        let mut older = sample_doc("Older", Some("job-1"));
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = sample_doc("Newer", Some("job-1"));
        let mut other = sample_doc("Other", Some("job-2"));
        other.category = "Plans".to_string();

        db.with_conn(|conn| {
            upsert(conn, &older)?;
            upsert(conn, &newer)?;
            upsert(conn, &other)?;

            let all = list(conn, &DocumentFilter::default())?;
            assert_eq!(all.len(), 3);

            let job_docs = list(
                conn,
                &DocumentFilter {
                    job_id: Some("job-1".to_string()),
                    category: None,
                },
            )?;
            let titles: Vec<&str> = job_docs.iter().map(|d| d.title.as_str()).collect();
            assert_eq!(titles, vec!["Newer", "Older"]);

            let plans = list(
                conn,
                &DocumentFilter {
                    job_id: None,
                    category: Some("Plans".to_string()),
                },
            )?;
            assert_eq!(plans.len(), 1);
            assert_eq!(plans[0].title, "Other");
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_delete_for_job() {
        let db = test_db();
        let a = sample_doc("A", Some("job-1"));
        let b = sample_doc("B", Some("job-1"));
        let c = sample_doc("C", None);
        db.with_conn(|conn| {
            upsert(conn, &a)?;
            upsert(conn, &b)?;
            upsert(conn, &c)?;

            let removed = delete_for_job(conn, "job-1")?;
            assert_eq!(removed.len(), 2);
            assert_eq!(count(conn)?, 1);
            assert!(delete(conn, &c.id)?);
            assert!(!delete(conn, &c.id)?);
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }
}
