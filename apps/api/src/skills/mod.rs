// Skill tagging against a fixed, categorized taxonomy.

pub mod repository;
pub mod tagger;
pub mod taxonomy;

/// Association weight stored for every tagged skill.
pub const DEFAULT_SKILL_WEIGHT: f64 = 0.8;
