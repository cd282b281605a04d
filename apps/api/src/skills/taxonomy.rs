//! Skill taxonomy: a fixed set of categories mapping to immutable lists of canonical names.
//!
//! Loaded once at startup (built-in JSON or `SKILL_TAXONOMY_PATH`) and shared read-only.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN_TAXONOMY: &str = include_str!("taxonomy.json");

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid taxonomy JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown skill category '{0}'")]
    UnknownCategory(String),

    #[error("Empty skill name in category '{0}'")]
    EmptyName(String),

    #[error("Skill '{0}' is listed more than once (names are case-insensitive)")]
    Duplicate(String),

    #[error("Could not build matcher for '{name}': {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillCategory {
    #[serde(rename = "technical_skills")]
    Technical,
    #[serde(rename = "soft_skills")]
    Soft,
    #[serde(rename = "tools")]
    Tool,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 3] = [Self::Technical, Self::Soft, Self::Tool];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical_skills",
            Self::Soft => "soft_skills",
            Self::Tool => "tools",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// One canonical skill and its compiled whole-word matcher.
#[derive(Debug, Clone)]
pub struct SkillEntry {
    pub name: String,
    pub category: SkillCategory,
    matcher: Regex,
}

impl SkillEntry {
    fn new(name: &str, category: SkillCategory) -> Result<Self, TaxonomyError> {
        // Delimited by non-word characters rather than `\b`, so names that start or
        // end with punctuation ("C++", "Node.js") still match as whole words.
        let pattern = format!(r"(?i)(?:^|\W){}(?:\W|$)", regex::escape(name));
        let matcher = Regex::new(&pattern).map_err(|source| TaxonomyError::Pattern {
            name: name.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.to_string(),
            category,
            matcher,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    version: String,
    categories: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct SkillTaxonomy {
    version: String,
    entries: Vec<SkillEntry>,
}

impl SkillTaxonomy {
    /// The taxonomy shipped with the binary.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_json(BUILTIN_TAXONOMY)
    }

    /// Loads from `path` when given, otherwise the built-in taxonomy.
    pub fn load(path: Option<&str>) -> Result<Self, TaxonomyError> {
        match path {
            Some(path) => Self::from_json(&std::fs::read_to_string(path)?),
            None => Self::builtin(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile = serde_json::from_str(json)?;
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for (category_name, names) in &file.categories {
            let category = SkillCategory::parse(category_name)
                .ok_or_else(|| TaxonomyError::UnknownCategory(category_name.clone()))?;
            for name in names {
                let name = name.trim();
                if name.is_empty() {
                    return Err(TaxonomyError::EmptyName(category_name.clone()));
                }
                if !seen.insert(name.to_lowercase()) {
                    return Err(TaxonomyError::Duplicate(name.to_string()));
                }
                entries.push(SkillEntry::new(name, category)?);
            }
        }

        Ok(Self {
            version: file.version,
            entries,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entries(&self) -> &[SkillEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_taxonomy_loads() {
        let taxonomy = SkillTaxonomy::builtin().unwrap();
        assert!(!taxonomy.version().is_empty());
        for category in SkillCategory::ALL {
            assert!(
                taxonomy.entries().iter().any(|e| e.category == category),
                "category {} has no entries",
                category.as_str()
            );
        }
    }

    #[test]
    fn test_builtin_names_keep_canonical_case() {
        let taxonomy = SkillTaxonomy::builtin().unwrap();
        let entry = taxonomy
            .entries()
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case("postgresql"))
            .unwrap();
        assert_eq!(entry.name, "PostgreSQL");
        assert_eq!(entry.category, SkillCategory::Technical);
    }

    #[test]
    fn test_duplicate_across_categories_rejected() {
        let json = r#"{"version":"t","categories":{
            "technical_skills":["Docker"],
            "tools":["docker"]}}"#;
        assert!(matches!(
            SkillTaxonomy::from_json(json),
            Err(TaxonomyError::Duplicate(_))
        ));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let json = r#"{"version":"t","categories":{"languages":["English"]}}"#;
        assert!(matches!(
            SkillTaxonomy::from_json(json),
            Err(TaxonomyError::UnknownCategory(c)) if c == "languages"
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let json = r#"{"version":"t","categories":{"soft_skills":["  "]}}"#;
        assert!(matches!(
            SkillTaxonomy::from_json(json),
            Err(TaxonomyError::EmptyName(_))
        ));
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in SkillCategory::ALL {
            assert_eq!(SkillCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(SkillCategory::parse("languages"), None);
    }
}
