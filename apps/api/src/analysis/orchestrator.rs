//! Fact extraction orchestration.
//!
//! Two independent constrained queries (education, experience) run concurrently
//! against the document text. Contract violations degrade the affected field;
//! backend failures are returned as `Fatal` and the caller applies the defaults.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::duration::total_years;
use crate::analysis::education::EducationLevel;
use crate::analysis::experience::{parse_experience_response, ExperienceResponse};
use crate::analysis::prompts::{EDUCATION_QUERY, EXPERIENCE_QUERY};
use crate::analysis::{ExperienceFacts, Outcome};
use crate::llm_client::prompts::{document_query, DIRECT_ANSWER_SYSTEM};
use crate::llm_client::{complete_text_within, ChatBackend, ChatMessage, ChatRequest, LlmError};

#[derive(Debug, Error)]
pub enum FactError {
    #[error("education query failed: {0}")]
    Education(#[source] LlmError),

    #[error("experience query failed: {0}")]
    Experience(#[source] LlmError),
}

#[derive(Clone)]
pub struct FactExtractor {
    backend: Arc<dyn ChatBackend>,
    model: String,
    timeout: Duration,
}

impl FactExtractor {
    pub fn new(backend: Arc<dyn ChatBackend>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout,
        }
    }

    /// Runs both queries concurrently. `today` resolves `PRESENT` end dates.
    pub async fn extract(&self, text: &str, today: NaiveDate) -> Outcome<ExperienceFacts, FactError> {
        let (education, experience) = tokio::join!(
            self.extract_education(text),
            self.extract_experience(text, today)
        );

        let mut reasons = Vec::new();
        let education_level = match education {
            Outcome::Success(level) => level,
            Outcome::DegradedDefault { value, reason } => {
                reasons.push(reason);
                value
            }
            Outcome::Fatal(e) => return Outcome::Fatal(FactError::Education(e)),
        };
        let total_years = match experience {
            Outcome::Success(years) => years,
            Outcome::DegradedDefault { value, reason } => {
                reasons.push(reason);
                value
            }
            Outcome::Fatal(e) => return Outcome::Fatal(FactError::Experience(e)),
        };

        let facts = ExperienceFacts {
            education_level,
            total_years,
        };
        info!(
            education_level = facts.education_level.as_str(),
            total_years = facts.total_years,
            degraded = !reasons.is_empty(),
            "Fact extraction finished"
        );

        if reasons.is_empty() {
            Outcome::Success(facts)
        } else {
            Outcome::DegradedDefault {
                value: facts,
                reason: reasons.join("; "),
            }
        }
    }

    pub async fn extract_education(&self, text: &str) -> Outcome<EducationLevel, LlmError> {
        let raw = match self.ask(text, EDUCATION_QUERY).await {
            Ok(raw) => raw,
            Err(e) => return Outcome::Fatal(e),
        };

        match EducationLevel::from_response(&raw) {
            Some(level) => Outcome::Success(level),
            None => {
                warn!("Education response violated the output contract: '{raw}'");
                Outcome::DegradedDefault {
                    value: EducationLevel::default(),
                    reason: format!("unrecognised education level '{}'", raw.trim()),
                }
            }
        }
    }

    pub async fn extract_experience(&self, text: &str, today: NaiveDate) -> Outcome<f64, LlmError> {
        let raw = match self.ask(text, EXPERIENCE_QUERY).await {
            Ok(raw) => raw,
            Err(e) => return Outcome::Fatal(e),
        };

        match parse_experience_response(&raw) {
            ExperienceResponse::NoExperience => Outcome::Success(0.0),
            ExperienceResponse::Spans { spans, skipped } => {
                if skipped > 0 {
                    warn!("Skipped {skipped} malformed experience lines");
                }
                Outcome::Success(total_years(&spans, today))
            }
            ExperienceResponse::Malformed => {
                warn!("Experience response violated the output contract: '{raw}'");
                Outcome::DegradedDefault {
                    value: 0.0,
                    reason: "experience response had no well-formed lines".to_string(),
                }
            }
        }
    }

    async fn ask(&self, text: &str, query: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(DIRECT_ANSWER_SYSTEM),
                ChatMessage::user(document_query(text, query)),
            ],
            max_tokens: None,
            temperature: 0.0,
            stop: vec![],
        };
        complete_text_within(self.backend.as_ref(), &request, self.timeout).await
    }
}

/// Resolves a fact extraction into the record to persist and, when degraded, why.
/// Backend failures fall back to `ExperienceFacts::default()`.
pub fn facts_or_default(outcome: Outcome<ExperienceFacts, FactError>) -> (ExperienceFacts, Option<String>) {
    match outcome {
        Outcome::Success(facts) => (facts, None),
        Outcome::DegradedDefault { value, reason } => (value, Some(reason)),
        Outcome::Fatal(e) => {
            warn!("Fact extraction failed, applying defaults: {e}");
            (ExperienceFacts::default(), Some(e.to_string()))
        }
    }
}
