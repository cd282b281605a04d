// Fact extraction: education level and total professional experience.
// All backend calls go through llm_client; no direct HTTP calls here.

pub mod duration;
pub mod education;
pub mod experience;
pub mod orchestrator;
pub mod prompts;

use serde::{Deserialize, Serialize};

use crate::analysis::education::EducationLevel;

/// Structured facts derived from a document. One per document, replaced wholesale on re-analysis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperienceFacts {
    pub education_level: EducationLevel,
    /// Non-negative, rounded to the nearest 0.5.
    pub total_years: f64,
}

/// Result of a contract-bound extraction. A degraded default must never be
/// mistaken for a genuine fact, so the variants stay distinct all the way to persistence.
#[derive(Debug)]
pub enum Outcome<T, E> {
    Success(T),
    DegradedDefault { value: T, reason: String },
    Fatal(E),
}

