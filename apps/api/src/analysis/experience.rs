//! Parsing of the experience query's line-oriented output grammar:
//!
//! ```text
//! NONE
//! Organization | MM/YYYY | MM/YYYY-or-PRESENT
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

const NONE_TOKEN: &str = "NONE";

/// One employment span exactly as the backend reported it. Dates are validated later
/// by the duration calculator, so a bad date only drops its own span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentSpan {
    pub organization: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExperienceResponse {
    /// The literal `NONE` token: no professional experience.
    NoExperience,
    /// At least one well-formed line; `skipped` counts lines that were not.
    Spans {
        spans: Vec<EmploymentSpan>,
        skipped: usize,
    },
    /// Neither `NONE` nor a single well-formed line.
    Malformed,
}

pub fn parse_experience_response(raw: &str) -> ExperienceResponse {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case(NONE_TOKEN) {
        return ExperienceResponse::NoExperience;
    }

    let mut spans = Vec::new();
    let mut skipped = 0;

    for line in trimmed.lines().filter(|l| !l.trim().is_empty()) {
        match parse_span_line(line) {
            Some(span) => spans.push(span),
            None => {
                debug!("Skipping malformed experience line: '{line}'");
                skipped += 1;
            }
        }
    }

    if spans.is_empty() {
        ExperienceResponse::Malformed
    } else {
        ExperienceResponse::Spans { spans, skipped }
    }
}

fn parse_span_line(line: &str) -> Option<EmploymentSpan> {
    let parts: Vec<&str> = line.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [organization, start, end]
            if !organization.is_empty() && !start.is_empty() && !end.is_empty() =>
        {
            Some(EmploymentSpan {
                organization: organization.to_string(),
                start: start.to_string(),
                end: end.to_string(),
            })
        }
        _ => None,
    }
}
