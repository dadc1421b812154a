//! Requests for report work: consultant tickets go to external consultants,
//! work tickets to internal staff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::assessment::AssessmentKind;
use super::document::FileRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    Pending,
    InProgress,
    Completed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TicketStatus::Pending),
            "in-progress" => Some(TicketStatus::InProgress),
            "completed" => Some(TicketStatus::Completed),
            _ => None,
        }
    }
}

/// Which file of a consultant work order an upload provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkOrderFile {
    Report,
    Invoice,
}

impl WorkOrderFile {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "report" => Some(WorkOrderFile::Report),
            "invoice" => Some(WorkOrderFile::Invoice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultantTicket {
    pub id: String,
    pub job_id: String,
    /// Planning category, e.g. `"Bushfire"`.
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultant_name: Option<String>,
    pub status: TicketStatus,
    #[serde(default)]
    pub assessment: Value,
    /// Document record created with the ticket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_document: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<FileRef>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ConsultantTicket {
    /// Key of this ticket's report under `job.documents`: the raw category.
    pub fn job_document_key(&self) -> &str {
        &self.category
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkTicket {
    pub id: String,
    pub job_id: String,
    pub ticket_type: AssessmentKind,
    pub status: TicketStatus,
    #[serde(default)]
    pub report_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_document: Option<FileRef>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkTicket {
    /// Key of this ticket's report under `job.documents`: the camelCase
    /// assessment key.
    pub fn job_document_key(&self) -> &'static str {
        self.ticket_type.job_key()
    }
}

/// Metadata submitted when creating a consultant ticket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConsultantTicket {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub consultant_id: Option<String>,
    #[serde(default)]
    pub consultant_name: Option<String>,
    #[serde(default)]
    pub assessment: Value,
    #[serde(default)]
    pub uploaded_by: Option<String>,
}

/// Metadata submitted when creating a work ticket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkTicket {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub ticket_type: Option<AssessmentKind>,
    #[serde(default)]
    pub report_data: Value,
    #[serde(default)]
    pub uploaded_by: Option<String>,
}

/// List filters shared by both ticket kinds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketFilter {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Consultant tickets only.
    #[serde(default)]
    pub consultant_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_matches_serde() {
        for status in [
            TicketStatus::Pending,
            TicketStatus::InProgress,
            TicketStatus::Completed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TicketStatus::parse("paid"), None);
    }

    #[test]
    fn test_work_ticket_document_key_is_camel_case() {
        let ticket: WorkTicket = serde_json::from_value(serde_json::json!({
            "id": "w1",
            "jobId": "j1",
            "ticketType": "statement-of-environmental-effects",
            "status": "pending",
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(ticket.job_document_key(), "statementOfEnvironmentalEffects");
        assert!(ticket.completed_document.is_none());
    }

    #[test]
    fn test_work_order_file_parse() {
        assert_eq!(WorkOrderFile::parse("report"), Some(WorkOrderFile::Report));
        assert_eq!(WorkOrderFile::parse("invoice"), Some(WorkOrderFile::Invoice));
        assert_eq!(WorkOrderFile::parse("receipt"), None);
    }
}
