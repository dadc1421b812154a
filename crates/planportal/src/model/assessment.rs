use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::FileRef;

/// Progress of an assessment or consultant assignment as shown on the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssessmentStatus {
    Pending,
    Paid,
    InProgress,
    Completed,
}

/// The internal reports staff produce for a job. Each one is stored on the
/// job under its camelCase key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssessmentKind {
    CustomAssessment,
    StatementOfEnvironmentalEffects,
    ComplyingDevelopmentCertificate,
}

impl AssessmentKind {
    pub const ALL: [AssessmentKind; 3] = [
        AssessmentKind::CustomAssessment,
        AssessmentKind::StatementOfEnvironmentalEffects,
        AssessmentKind::ComplyingDevelopmentCertificate,
    ];

    /// Field name on the job, also used as the `job.documents` key.
    pub fn job_key(self) -> &'static str {
        match self {
            AssessmentKind::CustomAssessment => "customAssessment",
            AssessmentKind::StatementOfEnvironmentalEffects => "statementOfEnvironmentalEffects",
            AssessmentKind::ComplyingDevelopmentCertificate => "complyingDevelopmentCertificate",
        }
    }

    pub fn from_job_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.job_key() == key)
    }

    /// Human readable title used for document records.
    pub fn title(self) -> &'static str {
        match self {
            AssessmentKind::CustomAssessment => "Custom Assessment",
            AssessmentKind::StatementOfEnvironmentalEffects => {
                "Statement of Environmental Effects"
            }
            AssessmentKind::ComplyingDevelopmentCertificate => {
                "Complying Development Certificate"
            }
        }
    }

    /// Stem for files produced for this kind, e.g. `statement-of-environmental-effects`.
    pub fn file_stem(self) -> &'static str {
        match self {
            AssessmentKind::CustomAssessment => "custom-assessment",
            AssessmentKind::StatementOfEnvironmentalEffects => "statement-of-environmental-effects",
            AssessmentKind::ComplyingDevelopmentCertificate => "complying-development-certificate",
        }
    }
}

/// An assessment sub-object embedded in a job.
///
/// Known fields are typed; anything else the client stores is kept in
/// `fields` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AssessmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_document: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
