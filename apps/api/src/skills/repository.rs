use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::skills::tagger::{flatten, SkillSet};
use crate::skills::taxonomy::SkillCategory;
use crate::skills::DEFAULT_SKILL_WEIGHT;

/// Associates every tagged skill with a document. Skills are shared rows, created on
/// first use and matched case-insensitively afterwards.
pub async fn save_document_skills(
    conn: &mut PgConnection,
    document_id: Uuid,
    skills: &SkillSet,
) -> Result<usize, sqlx::Error> {
    let mut saved = 0;

    for (name, category) in flatten(skills) {
        let skill_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO skills (name, category)
            VALUES ($1, $2)
            ON CONFLICT ((lower(name))) DO UPDATE SET name = skills.name
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(category.as_str())
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO document_skills (document_id, skill_id, weight)
            VALUES ($1, $2, $3)
            ON CONFLICT (document_id, skill_id) DO NOTHING
            "#,
        )
        .bind(document_id)
        .bind(skill_id)
        .bind(DEFAULT_SKILL_WEIGHT)
        .execute(&mut *conn)
        .await?;

        saved += 1;
    }

    info!(%document_id, "Associated {saved} skills with document");
    Ok(saved)
}

/// Skills of one document grouped by category.
pub async fn get_document_skills(pool: &PgPool, document_id: Uuid) -> Result<SkillSet, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT s.name, s.category
        FROM skills s
        JOIN document_skills ds ON ds.skill_id = s.id
        WHERE ds.document_id = $1
        ORDER BY s.category, s.name
        "#,
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    Ok(group_rows(rows))
}

fn group_rows(rows: Vec<(String, String)>) -> SkillSet {
    let mut skills = SkillSet::new();
    for (name, category) in rows {
        match SkillCategory::parse(&category) {
            Some(category) => {
                skills.entry(category).or_default().insert(name);
            }
            None => warn!("Ignoring skill '{name}' with unknown category '{category}'"),
        }
    }
    skills
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_rows_by_category() {
        let rows = vec![
            ("Python".to_string(), "technical_skills".to_string()),
            ("Rust".to_string(), "technical_skills".to_string()),
            ("Leadership".to_string(), "soft_skills".to_string()),
            ("Juggling".to_string(), "hobbies".to_string()),
        ];
        let skills = group_rows(rows);
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[&SkillCategory::Technical].len(), 2);
        assert!(skills[&SkillCategory::Soft].contains("Leadership"));
    }
}
