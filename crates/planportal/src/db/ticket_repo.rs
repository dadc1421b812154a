//! Ticket repository: the `consultant_tickets` and `work_tickets` tables.

use rusqlite::{params, Connection, ToSql};

use super::{count_rows, encode, query_record, query_records, timestamp, DatabaseError};
use crate::model::{ConsultantTicket, TicketFilter, WorkTicket};

/// Inserts or replaces a consultant ticket.
pub fn upsert_consultant(conn: &Connection, ticket: &ConsultantTicket) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO consultant_tickets (id, job_id, category, status, created_at, consultant_id, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
           job_id = ?2,
           category = ?3,
           status = ?4,
           consultant_id = ?6,
           data = ?7",
        params![
            ticket.id,
            ticket.job_id,
            ticket.category,
            ticket.status.as_str(),
            timestamp(&ticket.created_at),
            ticket.consultant_id,
            encode(ticket)?,
        ],
    )?;
    Ok(())
}

pub fn find_consultant(conn: &Connection, id: &str) -> Result<Option<ConsultantTicket>, DatabaseError> {
    query_record(
        conn,
        "SELECT data FROM consultant_tickets WHERE id = ?1",
        params![id],
    )
}

/// Lists consultant tickets, newest first.
pub fn list_consultant(
    conn: &Connection,
    filter: &TicketFilter,
) -> Result<Vec<ConsultantTicket>, DatabaseError> {
    let (where_clause, param_values) = filter_clause(filter, true);
    let sql = format!(
        "SELECT data FROM consultant_tickets {} ORDER BY created_at DESC, id",
        where_clause
    );
    query_records(conn, &sql, &param_values)
}

pub fn count_consultant(conn: &Connection) -> Result<u64, DatabaseError> {
    count_rows(conn, "consultant_tickets")
}

/// Inserts or replaces a work ticket.
pub fn upsert_work(conn: &Connection, ticket: &WorkTicket) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO work_tickets (id, job_id, ticket_type, status, created_at, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           job_id = ?2,
           ticket_type = ?3,
           status = ?4,
           data = ?6",
        params![
            ticket.id,
            ticket.job_id,
            ticket.ticket_type.file_stem(),
            ticket.status.as_str(),
            timestamp(&ticket.created_at),
            encode(ticket)?,
        ],
    )?;
    Ok(())
}

pub fn find_work(conn: &Connection, id: &str) -> Result<Option<WorkTicket>, DatabaseError> {
    query_record(conn, "SELECT data FROM work_tickets WHERE id = ?1", params![id])
}

/// Lists work tickets, newest first.
pub fn list_work(conn: &Connection, filter: &TicketFilter) -> Result<Vec<WorkTicket>, DatabaseError> {
    let (where_clause, param_values) = filter_clause(filter, false);
    let sql = format!(
        "SELECT data FROM work_tickets {} ORDER BY created_at DESC, id",
        where_clause
    );
    query_records(conn, &sql, &param_values)
}

pub fn count_work(conn: &Connection) -> Result<u64, DatabaseError> {
    count_rows(conn, "work_tickets")
}

fn filter_clause(filter: &TicketFilter, with_consultant: bool) -> (String, Vec<&dyn ToSql>) {
    let mut conditions = Vec::new();
    let mut param_values: Vec<&dyn ToSql> = Vec::new();

    if let Some(ref job_id) = filter.job_id {
        conditions.push(format!("job_id = ?{}", param_values.len() + 1));
        param_values.push(job_id);
    }
    if let Some(ref status) = filter.status {
        conditions.push(format!("status = ?{}", param_values.len() + 1));
        param_values.push(status);
    }
    if with_consultant {
        if let Some(ref consultant_id) = filter.consultant_id {
            conditions.push(format!("consultant_id = ?{}", param_values.len() + 1));
            param_values.push(consultant_id);
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (where_clause, param_values)
}
