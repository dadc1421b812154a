//! Knowledge-base articles: reusable assessment text grouped into sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The separate knowledge bases kept by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KbKind {
    Custom,
    Soee,
    Cdc,
    PrePrepared,
}

impl KbKind {
    pub const ALL: [KbKind; 4] = [KbKind::Custom, KbKind::Soee, KbKind::Cdc, KbKind::PrePrepared];

    pub fn as_str(self) -> &'static str {
        match self {
            KbKind::Custom => "custom",
            KbKind::Soee => "soee",
            KbKind::Cdc => "cdc",
            KbKind::PrePrepared => "pre-prepared",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }

    /// Collection name, e.g. `kb-soee-assessments`.
    pub fn collection(self) -> String {
        format!("kb-{}-assessments", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbAttachment {
    pub file_name: String,
    pub original_name: String,
    pub stored_path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbArticle {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<KbAttachment>,
    /// Older knowledge-base files carry no timestamps.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbSection {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub assessments: Vec<KbArticle>,
}

/// Metadata submitted with an article create or update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbArticleInput {
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}
