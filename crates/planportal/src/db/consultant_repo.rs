//! Consultant directory repository.

use rusqlite::{params, Connection};

use super::{count_rows, encode, query_record, query_records, timestamp, DatabaseError};
use crate::model::Consultant;

/// Inserts or replaces a consultant.
pub fn upsert(conn: &Connection, consultant: &Consultant) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO consultants (id, category, created_at, data)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           category = ?2,
           data = ?4",
        params![
            consultant.id,
            consultant.category,
            timestamp(&consultant.created_at),
            encode(consultant)?,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: &str) -> Result<Option<Consultant>, DatabaseError> {
    query_record(conn, "SELECT data FROM consultants WHERE id = ?1", params![id])
}

pub fn exists(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let found: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM consultants WHERE id = ?1)",
        params![id],
        |r| r.get(0),
    )?;
    Ok(found)
}

/// Lists consultants in creation order, optionally for one category.
pub fn list(conn: &Connection, category: Option<&str>) -> Result<Vec<Consultant>, DatabaseError> {
    match category {
        Some(category) => query_records(
            conn,
            "SELECT data FROM consultants WHERE category = ?1 ORDER BY created_at, id",
            params![category],
        ),
        None => query_records(
            conn,
            "SELECT data FROM consultants ORDER BY created_at, id",
            &[],
        ),
    }
}

/// Deletes a consultant. Returns whether a row was removed.
pub fn delete(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let removed = conn.execute("DELETE FROM consultants WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

pub fn count(conn: &Connection) -> Result<u64, DatabaseError> {
    count_rows(conn, "consultants")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::{Duration, Utc};

    fn consultant(id: &str, category: &str, minutes_ago: i64) -> Consultant {
        Consultant {
            id: id.to_string(),
            name: format!("Consultant {}", id),
            category: category.to_string(),
            company: None,
            email: Some(format!("{}@example.com", id)),
            phone: None,
            notes: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_crud() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let mut c = consultant("c1", "Bushfire", 0);
            upsert(conn, &c)?;
            assert!(exists(conn, "c1")?);
            assert!(!exists(conn, "c2")?);

            c.phone = Some("0400 000 000".to_string());
            upsert(conn, &c)?;
            assert_eq!(find(conn, "c1")?, Some(c));

            assert!(delete(conn, "c1")?);
            assert!(find(conn, "c1")?.is_none());
            assert_eq!(count(conn)?, 0);
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }

    #[test]
    fn test_list_by_category_in_creation_order() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            upsert(conn, &consultant("c2", "Bushfire", 1))?;
            upsert(conn, &consultant("c1", "Bushfire", 5))?;
            upsert(conn, &consultant("c3", "Arborist", 3))?;

            let all = list(conn, None)?;
            let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec!["c1", "c3", "c2"]);

            let bushfire = list(conn, Some("Bushfire"))?;
            assert_eq!(bushfire.len(), 2);
            Ok::<_, DatabaseError>(())
        })
        .unwrap();
    }
}
