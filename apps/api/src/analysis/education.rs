use serde::{Deserialize, Serialize};

/// Highest education level. The backend must answer with exactly one of these labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EducationLevel {
    #[default]
    #[serde(rename = "High School")]
    HighSchool,
    #[serde(rename = "Associate's")]
    Associate,
    #[serde(rename = "Bachelor's")]
    Bachelor,
    #[serde(rename = "Master's")]
    Master,
    #[serde(rename = "PhD")]
    Phd,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 5] = [
        Self::HighSchool,
        Self::Associate,
        Self::Bachelor,
        Self::Master,
        Self::Phd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighSchool => "High School",
            Self::Associate => "Associate's",
            Self::Bachelor => "Bachelor's",
            Self::Master => "Master's",
            Self::Phd => "PhD",
        }
    }

    /// Parses a backend answer against the output contract.
    ///
    /// Only surrounding whitespace, letter case and a typographic apostrophe are
    /// tolerated. Anything else (extra words, several values, empty) is `None`.
    pub fn from_response(raw: &str) -> Option<Self> {
        let normalized = raw.trim().replace('\u{2019}', "'");
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(&normalized))
    }
}
