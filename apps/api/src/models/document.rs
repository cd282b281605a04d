use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::analysis::education::EducationLevel;
use crate::analysis::ExperienceFacts;

/// Document lifecycle. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Received,
    Extracted,
    Analyzed,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Extracted => "extracted",
            Self::Analyzed => "analyzed",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub owner_id: String,
    pub file_name: String,
    pub format: String,
    pub storage_key: String,
    pub status: String,
    #[serde(skip_serializing)]
    pub extracted_text: Option<String>,
    pub education_level: Option<String>,
    pub total_years: Option<f64>,
    pub facts_degraded: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRow {
    /// Facts from the most recent analysis, if the document has been analyzed.
    pub fn facts(&self) -> Option<ExperienceFacts> {
        let education_level = self
            .education_level
            .as_deref()
            .and_then(EducationLevel::from_response)?;
        Some(ExperienceFacts {
            education_level,
            total_years: self.total_years?,
        })
    }
}
