use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::skills::taxonomy::{SkillCategory, SkillTaxonomy};

/// Matched canonical skill names grouped by category. Categories without matches are absent.
pub type SkillSet = BTreeMap<SkillCategory, BTreeSet<String>>;

/// Scans `text` for every taxonomy entry using whole-word, case-insensitive matching.
///
/// Pure function of (text, taxonomy): no I/O, no shared state.
pub fn tag_skills(text: &str, taxonomy: &SkillTaxonomy) -> SkillSet {
    let mut skills = SkillSet::new();

    if text.trim().is_empty() {
        warn!("Empty text provided for skill extraction");
        return skills;
    }

    for entry in taxonomy.entries() {
        if entry.matches(text) {
            debug!(
                "Found skill: {} in category: {}",
                entry.name,
                entry.category.as_str()
            );
            skills
                .entry(entry.category)
                .or_default()
                .insert(entry.name.clone());
        }
    }

    info!(
        taxonomy_version = taxonomy.version(),
        "Extracted {} skills across {} categories",
        skills.values().map(BTreeSet::len).sum::<usize>(),
        skills.len()
    );
    skills
}

/// Flattens a skill set into (name, category) pairs, one per canonical name.
pub fn flatten(skills: &SkillSet) -> Vec<(&str, SkillCategory)> {
    skills
        .iter()
        .flat_map(|(category, names)| names.iter().map(move |n| (n.as_str(), *category)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> SkillTaxonomy {
        SkillTaxonomy::builtin().unwrap()
    }

    fn names(skills: &SkillSet, category: SkillCategory) -> Vec<&str> {
        skills
            .get(&category)
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_every_entry_matches_as_standalone_word() {
        let taxonomy = taxonomy();
        for entry in taxonomy.entries() {
            let text = format!("Experienced with {} on a daily basis.", entry.name);
            let skills = tag_skills(&text, &taxonomy);
            assert!(
                names(&skills, entry.category).contains(&entry.name.as_str()),
                "'{}' was not tagged in: {text}",
                entry.name
            );
        }
    }

    #[test]
    fn test_no_entry_matches_when_embedded_in_a_longer_word() {
        let taxonomy = taxonomy();
        for entry in taxonomy.entries() {
            let text = format!("x{}x", entry.name.to_lowercase());
            let skills = tag_skills(&text, &taxonomy);
            assert!(
                !names(&skills, entry.category).contains(&entry.name.as_str()),
                "'{}' matched inside: {text}",
                entry.name
            );
        }
    }

    #[test]
    fn test_java_not_matched_inside_javanese_or_javascript() {
        let skills = tag_skills("Fluent in Javanese. Built apps in JavaScript.", &taxonomy());
        let technical = names(&skills, SkillCategory::Technical);
        assert!(!technical.contains(&"Java"));
        assert!(technical.contains(&"JavaScript"));
    }

    #[test]
    fn test_case_insensitive_and_punctuation_delimited() {
        let skills = tag_skills("python, c++ and node.js; LEADERSHIP (mentoring)", &taxonomy());
        assert_eq!(
            names(&skills, SkillCategory::Technical),
            vec!["C++", "Node.js", "Python"]
        );
        assert_eq!(
            names(&skills, SkillCategory::Soft),
            vec!["Leadership", "Mentoring"]
        );
    }

    #[test]
    fn test_repeated_mentions_are_deduplicated() {
        let skills = tag_skills("Python. Python! PYTHON?", &taxonomy());
        assert_eq!(names(&skills, SkillCategory::Technical), vec!["Python"]);
    }

    #[test]
    fn test_categories_without_matches_are_omitted() {
        let skills = tag_skills("Python and Leadership", &taxonomy());
        assert_eq!(skills.len(), 2);
        assert!(!skills.contains_key(&SkillCategory::Tool));
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(tag_skills("   \n ", &taxonomy()).is_empty());
    }

    #[test]
    fn test_tagging_is_idempotent_across_calls_and_threads() {
        let taxonomy = taxonomy();
        let text = "Rust, Docker, Kubernetes, JIRA, Teamwork and Problem Solving";
        let expected = tag_skills(text, &taxonomy);
        for _ in 0..5 {
            assert_eq!(tag_skills(text, &taxonomy), expected);
        }
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| tag_skills(text, &taxonomy)))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_serializes_with_category_keys() {
        let skills = tag_skills("Python and Leadership", &taxonomy());
        let json = serde_json::to_value(&skills).unwrap();
        assert_eq!(json["technical_skills"], serde_json::json!(["Python"]));
        assert_eq!(json["soft_skills"], serde_json::json!(["Leadership"]));
    }

    #[test]
    fn test_flatten_pairs_names_with_categories() {
        let skills = tag_skills("Git and Slack", &taxonomy());
        let flat = flatten(&skills);
        assert!(flat.contains(&("Git", SkillCategory::Technical)));
        assert!(flat.contains(&("Slack", SkillCategory::Tool)));
    }
}
