//! Staged mutations applied as one unit.
//!
//! Commit order: table writes inside a SQLite transaction, then the job
//! file, then the transaction commit. If any step fails the transaction is
//! dropped (rolled back), the job file is restored from its snapshot and
//! every staged file is deleted. Files marked obsolete are deleted only
//! after a successful commit.

use crate::db::{document_repo, ticket_repo};
use crate::model::{ConsultantTicket, Document, Job, WorkTicket};

use super::Portal;

#[derive(Debug, Default)]
pub struct ChangeSet {
    job: Option<Job>,
    documents: Vec<Document>,
    removed_documents: Vec<String>,
    consultant_tickets: Vec<ConsultantTicket>,
    work_tickets: Vec<WorkTicket>,
    staged_files: Vec<String>,
    obsolete_files: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_job(&mut self, job: Job) {
        self.job = Some(job);
    }

    pub fn put_document(&mut self, doc: Document) {
        self.documents.retain(|d| d.id != doc.id);
        self.documents.push(doc);
    }

    pub fn remove_document(&mut self, id: &str) {
        self.documents.retain(|d| d.id != id);
        self.removed_documents.push(id.to_string());
    }

    pub fn put_consultant_ticket(&mut self, ticket: ConsultantTicket) {
        self.consultant_tickets.retain(|t| t.id != ticket.id);
        self.consultant_tickets.push(ticket);
    }

    pub fn put_work_ticket(&mut self, ticket: WorkTicket) {
        self.work_tickets.retain(|t| t.id != ticket.id);
        self.work_tickets.push(ticket);
    }

    /// A file written for this change; deleted if the commit fails.
    pub fn stage_file(&mut self, relative: &str) {
        self.staged_files.push(relative.to_string());
    }

    /// A file no longer referenced once this change commits.
    pub fn discard_file(&mut self, relative: &str) {
        self.obsolete_files.push(relative.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.job.is_none()
            && self.documents.is_empty()
            && self.removed_documents.is_empty()
            && self.consultant_tickets.is_empty()
            && self.work_tickets.is_empty()
    }
}

impl Portal {
    /// Applies `changes` atomically. The caller must hold the commit gate.
    pub(crate) fn commit(&self, changes: ChangeSet) -> crate::Result<()> {
        let snapshot = match changes.job.as_ref().map(|job| self.jobs.snapshot(&job.id)).transpose() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.files
                    .remove_best_effort(changes.staged_files.iter().map(String::as_str));
                return Err(e.into());
            }
        };

        let result = self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            for id in &changes.removed_documents {
                document_repo::delete(&tx, id)?;
            }
            for doc in &changes.documents {
                document_repo::upsert(&tx, doc)?;
            }
            for ticket in &changes.consultant_tickets {
                ticket_repo::upsert_consultant(&tx, ticket)?;
            }
            for ticket in &changes.work_tickets {
                ticket_repo::upsert_work(&tx, ticket)?;
            }
            if let Some(job) = &changes.job {
                self.jobs.save(job)?;
            }
            tx.commit()?;
            Ok::<_, crate::PortalError>(())
        });

        if let Err(e) = result {
            log::error!("Commit failed, rolling back: {}", e);
            if let Some(snapshot) = &snapshot {
                if let Err(restore_err) = self.jobs.restore(snapshot) {
                    log::error!("Failed to restore job file: {}", restore_err);
                }
            }
            self.files
                .remove_best_effort(changes.staged_files.iter().map(String::as_str));
            return Err(e);
        }

        if !changes.obsolete_files.is_empty() {
            self.files
                .remove_best_effort(changes.obsolete_files.iter().map(String::as_str));
        }
        log::debug!(
            "Committed job={} documents={} consultant_tickets={} work_tickets={} files={}",
            changes
                .job
                .as_ref()
                .map(|j| j.id.as_str())
                .unwrap_or("-"),
            changes.documents.len() + changes.removed_documents.len(),
            changes.consultant_tickets.len(),
            changes.work_tickets.len(),
            changes.staged_files.len()
        );
        Ok(())
    }
}
