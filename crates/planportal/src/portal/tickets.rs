//! Consultant and work ticket workflows.
//!
//! Both ticket kinds share one implementation of create, upload and return
//! through [`TicketRecord`]. Each workflow reads the ticket, the job and the
//! ticket's document record, stages every change in a [`ChangeSet`] and
//! commits once.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db::{consultant_repo, document_repo, ticket_repo, DatabaseError};
use crate::error::{PortalError, Result, StorageError};
use crate::model::{
    AssessmentStatus, ConsultantTicket, Document, DocumentVersion, FileRef, Job, JobDocument,
    NewConsultantTicket, NewWorkTicket, TicketFilter, TicketStatus, WorkOrderFile, WorkTicket,
};
use crate::sanitize;
use crate::storage::{DataPaths, StoredFile};

use super::{file_name_of, ChangeSet, Portal, Upload, DEFAULT_UPLOADER};

/// The fields a ticket owns on its job: a consultant assignment or an
/// assessment object.
struct JobSlot<'a> {
    status: &'a mut Option<AssessmentStatus>,
    completed_document: &'a mut Option<FileRef>,
    returned_at: &'a mut Option<DateTime<Utc>>,
}

trait TicketRecord: Clone + Sized {
    /// Entity name used in errors and logs.
    const KIND: &'static str;

    fn find(conn: &Connection, id: &str) -> std::result::Result<Option<Self>, DatabaseError>;
    fn stage(&self, changes: &mut ChangeSet);

    fn id(&self) -> &str;
    fn job_id(&self) -> &str;
    fn document_id(&self) -> Option<&str>;
    fn set_document_id(&mut self, id: String);
    fn completed_document(&self) -> Option<&FileRef>;
    fn completed_document_mut(&mut self) -> &mut Option<FileRef>;
    fn mark_returned(&mut self, at: DateTime<Utc>);

    /// Key of the returned report under `job.documents`.
    fn report_key(&self) -> String;
    /// Stem of the report file in the job documents directory.
    fn report_stem(&self) -> String;
    /// Title and category of the ticket's document record.
    fn document_title(&self) -> String;
    fn document_category(&self) -> String;
    fn job_slot<'j>(&self, job: &'j mut Job) -> JobSlot<'j>;
}

impl TicketRecord for ConsultantTicket {
    const KIND: &'static str = "Consultant ticket";

    fn find(conn: &Connection, id: &str) -> std::result::Result<Option<Self>, DatabaseError> {
        ticket_repo::find_consultant(conn, id)
    }

    fn stage(&self, changes: &mut ChangeSet) {
        changes.put_consultant_ticket(self.clone());
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn job_id(&self) -> &str {
        &self.job_id
    }

    fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    fn set_document_id(&mut self, id: String) {
        self.document_id = Some(id);
    }

    fn completed_document(&self) -> Option<&FileRef> {
        self.completed_document.as_ref()
    }

    fn completed_document_mut(&mut self) -> &mut Option<FileRef> {
        &mut self.completed_document
    }

    fn mark_returned(&mut self, at: DateTime<Utc>) {
        self.status = TicketStatus::Completed;
        self.returned_at = Some(at);
        if let Some(doc) = self.completed_document.as_mut() {
            doc.returned_at = Some(at);
        }
    }

    fn report_key(&self) -> String {
        self.job_document_key().to_string()
    }

    fn report_stem(&self) -> String {
        format!("{}-report", sanitize::slugify(&self.category))
    }

    fn document_title(&self) -> String {
        format!("{} Report", self.category)
    }

    fn document_category(&self) -> String {
        self.category.clone()
    }

    fn job_slot<'j>(&self, job: &'j mut Job) -> JobSlot<'j> {
        let assignment = job.assignment_for_ticket_mut(&self.category, &self.id);
        JobSlot {
            status: &mut assignment.status,
            completed_document: &mut assignment.completed_document,
            returned_at: &mut assignment.returned_at,
        }
    }
}

impl TicketRecord for WorkTicket {
    const KIND: &'static str = "Work ticket";

    fn find(conn: &Connection, id: &str) -> std::result::Result<Option<Self>, DatabaseError> {
        ticket_repo::find_work(conn, id)
    }

    fn stage(&self, changes: &mut ChangeSet) {
        changes.put_work_ticket(self.clone());
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn job_id(&self) -> &str {
        &self.job_id
    }

    fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    fn set_document_id(&mut self, id: String) {
        self.document_id = Some(id);
    }

    fn completed_document(&self) -> Option<&FileRef> {
        self.completed_document.as_ref()
    }

    fn completed_document_mut(&mut self) -> &mut Option<FileRef> {
        &mut self.completed_document
    }

    fn mark_returned(&mut self, at: DateTime<Utc>) {
        self.status = TicketStatus::Completed;
        self.returned_at = Some(at);
        self.completed_at = Some(at);
        if let Some(doc) = self.completed_document.as_mut() {
            doc.returned_at = Some(at);
        }
    }

    fn report_key(&self) -> String {
        self.job_document_key().to_string()
    }

    fn report_stem(&self) -> String {
        self.ticket_type.file_stem().to_string()
    }

    fn document_title(&self) -> String {
        self.ticket_type.title().to_string()
    }

    fn document_category(&self) -> String {
        self.ticket_type.title().to_string()
    }

    fn job_slot<'j>(&self, job: &'j mut Job) -> JobSlot<'j> {
        let assessment = job.assessment_mut(self.ticket_type);
        assessment.ticket_id = Some(self.id.clone());
        JobSlot {
            status: &mut assessment.status,
            completed_document: &mut assessment.completed_document,
            returned_at: &mut assessment.returned_at,
        }
    }
}

impl Portal {
    pub fn list_consultant_tickets(&self, filter: &TicketFilter) -> Result<Vec<ConsultantTicket>> {
        check_status_filter(filter)?;
        Ok(self
            .db
            .with_conn(|conn| ticket_repo::list_consultant(conn, filter))?)
    }

    pub fn get_consultant_ticket(&self, id: &str) -> Result<ConsultantTicket> {
        self.load_ticket(id)
    }

    /// Opens a consultant ticket. The consultant name is filled from the
    /// directory when only an id is given.
    pub fn create_consultant_ticket(
        &self,
        meta: NewConsultantTicket,
        upload: Option<Upload>,
    ) -> Result<ConsultantTicket> {
        let job_id = required(meta.job_id, "jobId")?;
        let category = required(meta.category, "category")?;

        let mut consultant_name = meta.consultant_name.filter(|n| !n.trim().is_empty());
        if consultant_name.is_none() {
            if let Some(consultant_id) = meta.consultant_id.as_deref() {
                let found = self
                    .db
                    .with_conn(|conn| consultant_repo::find(conn, consultant_id))?;
                match found {
                    Some(consultant) => consultant_name = Some(consultant.name),
                    None => log::warn!("Ticket names unknown consultant {}", consultant_id),
                }
            }
        }

        let ticket = ConsultantTicket {
            id: uuid::Uuid::new_v4().to_string(),
            job_id,
            category,
            consultant_id: meta.consultant_id,
            consultant_name,
            status: TicketStatus::Pending,
            assessment: meta.assessment,
            document_id: None,
            completed_document: None,
            invoice: None,
            created_at: Utc::now(),
            returned_at: None,
            completed_at: None,
        };
        let uploaded_by = meta.uploaded_by.unwrap_or_else(|| DEFAULT_UPLOADER.to_string());
        self.open_ticket(ticket, upload, &uploaded_by, |ticket, job| {
            let at = ticket.created_at;
            let assignment = job.assignment_for_ticket_mut(&ticket.category, &ticket.id);
            assignment.status = Some(AssessmentStatus::Paid);
            assignment.consultant_id = ticket.consultant_id.clone();
            assignment.consultant_name = ticket.consultant_name.clone();
            assignment.assigned_at = Some(at);
        })
    }

    /// Stores the consultant's report for a ticket.
    pub fn upload_consultant_report(
        &self,
        ticket_id: &str,
        upload: Upload,
        uploaded_by: Option<String>,
    ) -> Result<ConsultantTicket> {
        self.upload_report::<ConsultantTicket>(ticket_id, upload, uploaded_by)
    }

    /// Stores one file of a consultant work order: the report (as for
    /// [`Portal::upload_consultant_report`]) or the invoice. Invoices are
    /// recorded on the ticket and the assignment only.
    pub fn upload_work_order_file(
        &self,
        ticket_id: &str,
        kind: WorkOrderFile,
        upload: Upload,
        uploaded_by: Option<String>,
    ) -> Result<ConsultantTicket> {
        if kind == WorkOrderFile::Report {
            return self.upload_consultant_report(ticket_id, upload, uploaded_by);
        }

        let _span = tracing::info_span!("upload_invoice", ticket_id = %ticket_id).entered();
        let _guard = self.lock();
        let mut ticket: ConsultantTicket = self.load_ticket(ticket_id)?;
        let mut job = self.jobs.get(&ticket.job_id)?;

        let mut changes = ChangeSet::new();
        let stored = self.files.store(
            &upload.bytes,
            &DataPaths::job_documents_relative(&ticket.job_id),
            &format!("{}-invoice", sanitize::slugify(&ticket.category)),
            upload.extension().as_deref(),
        )?;
        changes.stage_file(&stored.relative);

        let invoice = file_ref(&stored, &upload, Utc::now(), &ticket.id, ticket.document_id.clone());
        let previous = ticket.invoice.replace(invoice.clone());
        job.assignment_for_ticket_mut(&ticket.category, &ticket.id).invoice = Some(invoice);
        if let Some(previous) = previous {
            changes.discard_file(&previous.stored_path);
        }

        changes.put_job(job);
        changes.put_consultant_ticket(ticket.clone());
        self.commit(changes)?;
        log::info!("Stored invoice {} for ticket {}", stored.relative, ticket.id);
        Ok(ticket)
    }

    pub fn return_consultant_ticket(&self, ticket_id: &str) -> Result<ConsultantTicket> {
        self.return_ticket::<ConsultantTicket>(ticket_id)
    }

    /// Closes a consultant work order once both the report and the invoice
    /// are in.
    pub fn complete_work_order(&self, ticket_id: &str) -> Result<ConsultantTicket> {
        let _span = tracing::info_span!("complete_work_order", ticket_id = %ticket_id).entered();
        let _guard = self.lock();
        let mut ticket: ConsultantTicket = self.load_ticket(ticket_id)?;

        let missing: Vec<&str> = [
            ("completedDocument", ticket.completed_document.is_none()),
            ("invoice", ticket.invoice.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        if !missing.is_empty() {
            return Err(PortalError::invalid(format!(
                "Work order {} is missing {}",
                ticket_id,
                missing.join(" and ")
            )));
        }

        let now = Utc::now();
        ticket.status = TicketStatus::Completed;
        ticket.completed_at = Some(now);
        for file in [ticket.completed_document.as_mut(), ticket.invoice.as_mut()]
            .into_iter()
            .flatten()
        {
            file.returned_at = Some(now);
        }

        let mut changes = ChangeSet::new();
        match self.jobs.get(&ticket.job_id) {
            Ok(mut job) => {
                let assignment = job.assignment_for_ticket_mut(&ticket.category, &ticket.id);
                assignment.status = Some(AssessmentStatus::Completed);
                assignment.completed_document = ticket.completed_document.clone();
                assignment.invoice = ticket.invoice.clone();
                assignment.returned_at = Some(now);
                changes.put_job(job);
            }
            Err(StorageError::JobNotFound(job_id)) => {
                log::warn!("Completing work order {} for missing job {}", ticket.id, job_id);
            }
            Err(e) => return Err(e.into()),
        }

        changes.put_consultant_ticket(ticket.clone());
        self.commit(changes)?;
        log::info!("Completed work order {}", ticket.id);
        Ok(ticket)
    }

    pub fn list_work_tickets(&self, filter: &TicketFilter) -> Result<Vec<WorkTicket>> {
        check_status_filter(filter)?;
        Ok(self.db.with_conn(|conn| ticket_repo::list_work(conn, filter))?)
    }

    pub fn get_work_ticket(&self, id: &str) -> Result<WorkTicket> {
        self.load_ticket(id)
    }

    pub fn create_work_ticket(
        &self,
        meta: NewWorkTicket,
        upload: Option<Upload>,
    ) -> Result<WorkTicket> {
        let job_id = required(meta.job_id, "jobId")?;
        let ticket_type = meta.ticket_type.ok_or(PortalError::MissingField("ticketType"))?;

        let ticket = WorkTicket {
            id: uuid::Uuid::new_v4().to_string(),
            job_id,
            ticket_type,
            status: TicketStatus::Pending,
            report_data: meta.report_data,
            document_id: None,
            completed_document: None,
            created_at: Utc::now(),
            returned_at: None,
            completed_at: None,
        };
        let uploaded_by = meta.uploaded_by.unwrap_or_else(|| DEFAULT_UPLOADER.to_string());
        self.open_ticket(ticket, upload, &uploaded_by, |ticket, job| {
            let assessment = job.assessment_mut(ticket.ticket_type);
            assessment.status = Some(AssessmentStatus::Paid);
            assessment.ticket_id = Some(ticket.id.clone());
        })
    }

    pub fn upload_work_report(
        &self,
        ticket_id: &str,
        upload: Upload,
        uploaded_by: Option<String>,
    ) -> Result<WorkTicket> {
        self.upload_report::<WorkTicket>(ticket_id, upload, uploaded_by)
    }

    pub fn return_work_ticket(&self, ticket_id: &str) -> Result<WorkTicket> {
        self.return_ticket::<WorkTicket>(ticket_id)
    }

    fn load_ticket<T: TicketRecord>(&self, id: &str) -> Result<T> {
        self.db
            .with_conn(|conn| T::find(conn, id))?
            .ok_or_else(|| PortalError::not_found(T::KIND, id))
    }

    /// Shared create: a document record (version 1 when a file is attached),
    /// the ticket, and `mark_job` applied to the job when it exists.
    fn open_ticket<T: TicketRecord>(
        &self,
        mut ticket: T,
        upload: Option<Upload>,
        uploaded_by: &str,
        mark_job: impl FnOnce(&T, &mut Job),
    ) -> Result<T> {
        let _span = tracing::info_span!(
            "create_ticket",
            kind = T::KIND,
            ticket_id = %ticket.id(),
            job_id = %ticket.job_id()
        )
        .entered();
        let _guard = self.lock();

        let job = match self.jobs.get(ticket.job_id()) {
            Ok(job) => Some(job),
            Err(StorageError::JobNotFound(job_id)) => {
                log::warn!("{} {} refers to missing job {}", T::KIND, ticket.id(), job_id);
                None
            }
            Err(e) => return Err(e.into()),
        };

        let mut changes = ChangeSet::new();
        let mut doc = Document::new(
            ticket.document_title(),
            format!("/jobs/{}", ticket.job_id()),
            ticket.document_category(),
        );
        doc.job_id = Some(ticket.job_id().to_string());
        doc.document_key = Some(ticket.report_key());
        if let Some(upload) = &upload {
            let version = self.store_version(&mut changes, &doc, upload, uploaded_by, Utc::now())?;
            doc.push_version(version);
        }
        ticket.set_document_id(doc.id.clone());

        if let Some(mut job) = job {
            mark_job(&ticket, &mut job);
            changes.put_job(job);
        }
        changes.put_document(doc);
        ticket.stage(&mut changes);
        self.commit(changes)?;

        log::info!("Opened {} {}", T::KIND.to_lowercase(), ticket.id());
        Ok(ticket)
    }

    /// Shared upload: stores the report in the job documents directory,
    /// records it on the ticket and the job, and appends a version to the
    /// ticket's document record.
    fn upload_report<T: TicketRecord>(
        &self,
        ticket_id: &str,
        upload: Upload,
        uploaded_by: Option<String>,
    ) -> Result<T> {
        let _span = tracing::info_span!("upload_report", kind = T::KIND, ticket_id = %ticket_id)
            .entered();
        let uploaded_by = uploaded_by
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOADER.to_string());

        let _guard = self.lock();
        let mut ticket: T = self.load_ticket(ticket_id)?;
        let mut job = self.jobs.get(ticket.job_id())?;
        let existing_doc = match ticket.document_id() {
            Some(doc_id) => self.db.with_conn(|conn| document_repo::find(conn, doc_id))?,
            None => None,
        };

        let mut changes = ChangeSet::new();
        let stored = self.files.store(
            &upload.bytes,
            &DataPaths::job_documents_relative(ticket.job_id()),
            &ticket.report_stem(),
            upload.extension().as_deref(),
        )?;
        changes.stage_file(&stored.relative);
        let now = Utc::now();

        let mut doc = existing_doc.unwrap_or_else(|| {
            log::warn!("{} {} had no document record; creating one", T::KIND, ticket.id());
            let mut doc = Document::new(
                ticket.document_title(),
                format!("/jobs/{}", ticket.job_id()),
                ticket.document_category(),
            );
            doc.job_id = Some(ticket.job_id().to_string());
            doc.document_key = Some(ticket.report_key());
            doc
        });
        doc.push_version(DocumentVersion {
            version: doc.next_version(),
            file_name: file_name_of(&stored.relative),
            original_name: upload.file_name.clone(),
            size: stored.size,
            content_type: upload.content_type(),
            uploaded_by,
            uploaded_at: now,
            stored_path: stored.relative.clone(),
        });
        ticket.set_document_id(doc.id.clone());

        let report = file_ref(&stored, &upload, now, ticket.id(), Some(doc.id.clone()));
        *ticket.completed_document_mut() = Some(report.clone());
        *ticket.job_slot(&mut job).completed_document = Some(report);

        changes.put_job(job);
        changes.put_document(doc);
        ticket.stage(&mut changes);
        self.commit(changes)?;

        log::info!("Stored report {} for {} {}", stored.relative, T::KIND.to_lowercase(), ticket.id());
        Ok(ticket)
    }

    /// Shared return: marks the ticket completed and surfaces a copy of the
    /// report on the job. Fails without touching anything when no report
    /// has been uploaded.
    fn return_ticket<T: TicketRecord>(&self, ticket_id: &str) -> Result<T> {
        let _span = tracing::info_span!("return_ticket", kind = T::KIND, ticket_id = %ticket_id)
            .entered();
        let _guard = self.lock();
        let mut ticket: T = self.load_ticket(ticket_id)?;
        let report = ticket.completed_document().cloned().ok_or_else(|| {
            PortalError::invalid(format!(
                "{} {} has no completed document to return",
                T::KIND,
                ticket_id
            ))
        })?;
        let mut job = self.jobs.get(ticket.job_id())?;
        let doc_version = match ticket.document_id() {
            Some(doc_id) => self
                .db
                .with_conn(|conn| document_repo::find(conn, doc_id))?
                .map(|d| d.current_version),
            None => None,
        };

        let mut changes = ChangeSet::new();
        let copy = self.files.copy_into(
            &report.stored_path,
            &DataPaths::job_documents_relative(ticket.job_id()),
            &ticket.report_stem(),
            sanitize::extension_of(&report.file_name).as_deref(),
        )?;
        changes.stage_file(&copy.relative);

        // A repeated return replaces the copy made by the previous one.
        let key = ticket.report_key();
        if let Some(previous) = job.documents.get(&key).map(|d| &d.file) {
            if previous.ticket_id.as_deref() == Some(ticket.id())
                && !previous.stored_path.is_empty()
                && previous.stored_path != report.stored_path
            {
                changes.discard_file(&previous.stored_path);
            }
        }

        let now = Utc::now();
        ticket.mark_returned(now);
        let returned = FileRef {
            file_name: file_name_of(&copy.relative),
            stored_path: copy.relative.clone(),
            size: copy.size,
            returned_at: Some(now),
            ..report
        };
        job.documents.insert(
            key,
            JobDocument {
                title: ticket.document_title(),
                category: ticket.document_category(),
                version: doc_version.filter(|v| *v > 0),
                file: returned.clone(),
            },
        );
        let slot = ticket.job_slot(&mut job);
        *slot.status = Some(AssessmentStatus::Completed);
        *slot.completed_document = Some(returned);
        *slot.returned_at = Some(now);

        changes.put_job(job);
        ticket.stage(&mut changes);
        self.commit(changes)?;

        log::info!(
            "Returned {} {} as {}",
            T::KIND.to_lowercase(),
            ticket.id(),
            copy.relative
        );
        Ok(ticket)
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(PortalError::MissingField(field))
}

fn check_status_filter(filter: &TicketFilter) -> Result<()> {
    match filter.status.as_deref() {
        Some(status) if TicketStatus::parse(status).is_none() => Err(PortalError::invalid(
            format!("Unknown ticket status: {}", status),
        )),
        _ => Ok(()),
    }
}

fn file_ref(
    stored: &StoredFile,
    upload: &Upload,
    at: DateTime<Utc>,
    ticket_id: &str,
    document_id: Option<String>,
) -> FileRef {
    FileRef {
        file_name: file_name_of(&stored.relative),
        original_name: sanitize::safe_file_name(&upload.file_name),
        stored_path: stored.relative.clone(),
        size: stored.size,
        content_type: upload.content_type(),
        uploaded_at: Some(at),
        returned_at: None,
        ticket_id: Some(ticket_id.to_string()),
        document_id,
    }
}
