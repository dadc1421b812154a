//! The job: a development-application case file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::assessment::{Assessment, AssessmentKind, AssessmentStatus};
use super::document::FileRef;
use super::property::PropertyData;

/// Stage given to freshly created jobs.
pub const INITIAL_STAGE: &str = "initial-assessment";

/// A job as stored: the raw JSON object, kept verbatim for reads, PUT and
/// PATCH so fields the model does not know survive untouched.
pub type JobRecord = Map<String, Value>;

/// A file surfaced on the job page under `job.documents[key]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(flatten)]
    pub file: FileRef,
}

/// A consultant engaged for one planning category of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultantAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AssessmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_document: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub council: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_data: Option<PropertyData>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub documents: BTreeMap<String, JobDocument>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_consultants"
    )]
    pub consultants: BTreeMap<String, Vec<ConsultantAssignment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_assessment: Option<Assessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_of_environmental_effects: Option<Assessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complying_development_certificate: Option<Assessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_check: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_submission: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifying_authority: Option<Value>,
    /// Older jobs carried the statement of environmental effects file here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_document: Option<FileRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Older job files store `consultants[category]` as a single object; newer
/// ones as a list. Both load as a list.
fn deserialize_consultants<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<ConsultantAssignment>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Slot {
        Many(Vec<ConsultantAssignment>),
        One(Box<ConsultantAssignment>),
        Empty(()),
    }

    let raw: Option<BTreeMap<String, Slot>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(category, slot)| {
            let list = match slot {
                Slot::Many(list) => list,
                Slot::One(single) => vec![*single],
                Slot::Empty(()) => Vec::new(),
            };
            (category, list)
        })
        .collect())
}

impl Job {
    pub fn new(address: impl Into<String>, council: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            address: address.into(),
            council: council.into(),
            current_stage: Some(INITIAL_STAGE.to_string()),
            created_at: Some(Utc::now()),
            updated_at: None,
            property_data: None,
            documents: BTreeMap::new(),
            consultants: BTreeMap::new(),
            custom_assessment: None,
            statement_of_environmental_effects: None,
            complying_development_certificate: None,
            design_check: None,
            manual_submission: None,
            certifying_authority: None,
            completed_document: None,
            extra: Map::new(),
        }
    }

    pub fn assessment(&self, kind: AssessmentKind) -> Option<&Assessment> {
        match kind {
            AssessmentKind::CustomAssessment => self.custom_assessment.as_ref(),
            AssessmentKind::StatementOfEnvironmentalEffects => {
                self.statement_of_environmental_effects.as_ref()
            }
            AssessmentKind::ComplyingDevelopmentCertificate => {
                self.complying_development_certificate.as_ref()
            }
        }
    }

    /// The assessment of `kind`, created empty when absent.
    pub fn assessment_mut(&mut self, kind: AssessmentKind) -> &mut Assessment {
        let slot = match kind {
            AssessmentKind::CustomAssessment => &mut self.custom_assessment,
            AssessmentKind::StatementOfEnvironmentalEffects => {
                &mut self.statement_of_environmental_effects
            }
            AssessmentKind::ComplyingDevelopmentCertificate => {
                &mut self.complying_development_certificate
            }
        };
        slot.get_or_insert_with(Assessment::default)
    }

    /// The assignment bound to `ticket_id` under `category`.
    ///
    /// Falls back to an unbound assignment (legacy data, created before
    /// tickets were linked) and finally appends a new one.
    pub fn assignment_for_ticket_mut(
        &mut self,
        category: &str,
        ticket_id: &str,
    ) -> &mut ConsultantAssignment {
        let list = self.consultants.entry(category.to_string()).or_default();
        let idx = list
            .iter()
            .position(|a| a.ticket_id.as_deref() == Some(ticket_id))
            .or_else(|| list.iter().position(|a| a.ticket_id.is_none()));
        let idx = match idx {
            Some(idx) => idx,
            None => {
                list.push(ConsultantAssignment::default());
                list.len() - 1
            }
        };
        let assignment = &mut list[idx];
        assignment.ticket_id = Some(ticket_id.to_string());
        assignment
    }

    pub fn assignments(&self, category: &str) -> &[ConsultantAssignment] {
        self.consultants
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

const LEGACY_COMPLETED_DOCUMENT: &str = "completedDocument";

/// Copies the legacy top-level `completedDocument` of a stored job into its
/// statement of environmental effects when both refer to the same ticket or
/// document. Works on the raw JSON so nothing else in the job is rewritten.
/// Returns whether anything changed.
pub fn promote_legacy_completed_document(job: &mut Map<String, Value>) -> bool {
    let Some(legacy) = job.get(LEGACY_COMPLETED_DOCUMENT).and_then(Value::as_object) else {
        return false;
    };
    let legacy = legacy.clone();
    let soee_key = AssessmentKind::StatementOfEnvironmentalEffects.job_key();
    let Some(Value::Object(soee)) = job.get_mut(soee_key) else {
        return false;
    };
    if soee
        .get(LEGACY_COMPLETED_DOCUMENT)
        .is_some_and(|existing| !existing.is_null())
    {
        return false;
    }
    if !(same_id(&legacy, soee, "ticketId") || same_id(&legacy, soee, "documentId")) {
        return false;
    }
    soee.insert(LEGACY_COMPLETED_DOCUMENT.to_string(), Value::Object(legacy));
    true
}

fn same_id(a: &Map<String, Value>, b: &Map<String, Value>, field: &str) -> bool {
    match (a.get(field).and_then(Value::as_str), b.get(field).and_then(Value::as_str)) {
        (Some(x), Some(y)) => !x.is_empty() && x == y,
        _ => false,
    }
}

/// Shallow-merges `patch` into a stored job.
///
/// Top-level fields are replaced, except the three assessment objects,
/// which merge field by field so a patch without `status` keeps the stored
/// one. The job id never changes.
pub fn merge_patch(job: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if key == "id" {
            continue;
        }
        if AssessmentKind::from_job_key(&key).is_some() {
            if let (Value::Object(fields), Some(Value::Object(existing))) =
                (&value, job.get_mut(&key))
            {
                for (field, field_value) in fields {
                    existing.insert(field.clone(), field_value.clone());
                }
                continue;
            }
        }
        job.insert(key, value);
    }
}
