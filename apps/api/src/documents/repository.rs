use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::analysis::education::EducationLevel;
use crate::analysis::ExperienceFacts;
use crate::errors::AppError;
use crate::extraction::DocumentFormat;
use crate::models::document::{DocumentRow, DocumentStatus};
use crate::skills::repository::save_document_skills;
use crate::skills::tagger::SkillSet;

pub struct NewDocument<'a> {
    pub id: Uuid,
    pub owner_id: &'a str,
    pub file_name: &'a str,
    pub format: DocumentFormat,
    pub storage_key: &'a str,
}

pub async fn insert_received(
    conn: &mut PgConnection,
    document: &NewDocument<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, owner_id, file_name, format, storage_key, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(document.id)
    .bind(document.owner_id)
    .bind(document.file_name)
    .bind(document.format.as_str())
    .bind(document.storage_key)
    .bind(DocumentStatus::Received.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Stores the extracted text. The text is never changed afterwards.
pub async fn mark_extracted(
    conn: &mut PgConnection,
    id: Uuid,
    text: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE documents
        SET extracted_text = $2, status = $3, updated_at = NOW()
        WHERE id = $1 AND extracted_text IS NULL
        "#,
    )
    .bind(id)
    .bind(text)
    .bind(DocumentStatus::Extracted.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Replaces the document's facts in a single statement, so readers see either the
/// previous facts or the new ones.
pub async fn update_facts(
    pool: &PgPool,
    id: Uuid,
    facts: &ExperienceFacts,
    degraded: bool,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET education_level = $2,
            total_years = $3,
            facts_degraded = $4,
            status = $5,
            error_message = NULL,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(facts.education_level.as_str())
    .bind(facts.total_years)
    .bind(degraded)
    .bind(DocumentStatus::Analyzed.as_str())
    .execute(pool)
    .await?;

    info!(
        document_id = %id,
        education_level = facts.education_level.as_str(),
        total_years = facts.total_years,
        degraded,
        "Stored experience facts"
    );
    Ok(result.rows_affected() > 0)
}

/// Removes a document by id regardless of owner. Used to undo a failed upload.
pub async fn discard_document(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_error(pool: &PgPool, id: Uuid, message: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE documents SET status = $2, error_message = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(DocumentStatus::Error.as_str())
    .bind(message)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_document(
    pool: &PgPool,
    id: Uuid,
    owner_id: &str,
) -> Result<Option<DocumentRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM documents WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_documents(pool: &PgPool, owner_id: &str) -> Result<Vec<DocumentRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM documents WHERE owner_id = $1 ORDER BY created_at DESC")
        .bind(owner_id)
        .fetch_all(pool)
        .await
}

/// Deletes a document with its skill associations and conversation turns.
/// Returns the storage key of the original file when a row was deleted.
pub async fn delete_document(
    pool: &PgPool,
    id: Uuid,
    owner_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("DELETE FROM documents WHERE id = $1 AND owner_id = $2 RETURNING storage_key")
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
}

/// The writes an upload performs, in the order it performs them.
#[async_trait]
pub trait DocumentRecords: Send + Sync {
    /// Inserts the document with its text and skills, all or nothing.
    async fn store_extracted(
        &self,
        document: &NewDocument<'_>,
        text: &str,
        skills: &SkillSet,
    ) -> Result<(), AppError>;

    /// Returns false when the document no longer exists.
    async fn update_facts(
        &self,
        id: Uuid,
        facts: &ExperienceFacts,
        degraded: bool,
    ) -> Result<bool, AppError>;

    async fn discard(&self, id: Uuid) -> Result<(), AppError>;

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgDocumentRecords {
    pool: PgPool,
}

impl PgDocumentRecords {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRecords for PgDocumentRecords {
    async fn store_extracted(
        &self,
        document: &NewDocument<'_>,
        text: &str,
        skills: &SkillSet,
    ) -> Result<(), AppError> {
        // Dropping the transaction on any error rolls back every write.
        let mut tx = self.pool.begin().await?;
        insert_received(&mut *tx, document).await?;
        mark_extracted(&mut *tx, document.id, text).await?;
        save_document_skills(&mut *tx, document.id, skills).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_facts(
        &self,
        id: Uuid,
        facts: &ExperienceFacts,
        degraded: bool,
    ) -> Result<bool, AppError> {
        Ok(update_facts(&self.pool, id, facts, degraded).await?)
    }

    async fn discard(&self, id: Uuid) -> Result<(), AppError> {
        Ok(discard_document(&self.pool, id).await?)
    }

    async fn mark_error(&self, id: Uuid, message: &str) -> Result<(), AppError> {
        Ok(mark_error(&self.pool, id, message).await?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentFilter {
    pub min_years: Option<f64>,
    pub max_years: Option<f64>,
    pub education_levels: Vec<EducationLevel>,
    /// Every listed skill must be present. Compared case-insensitively.
    pub skills: Vec<String>,
}

impl DocumentFilter {
    pub fn validate(&self) -> Result<(), String> {
        for years in [self.min_years, self.max_years].into_iter().flatten() {
            if !years.is_finite() || years < 0.0 {
                return Err("experience bounds must be non-negative numbers".to_string());
            }
        }
        if let (Some(min), Some(max)) = (self.min_years, self.max_years) {
            if min > max {
                return Err("min_years must not exceed max_years".to_string());
            }
        }
        if self.skills.iter().any(|s| s.trim().is_empty()) {
            return Err("skill names must not be empty".to_string());
        }
        Ok(())
    }

    fn build_query(&self, owner_id: &str) -> QueryBuilder<'static, Postgres> {
        let mut query = QueryBuilder::new("SELECT d.* FROM documents d WHERE d.owner_id = ");
        query.push_bind(owner_id.to_string());

        if let Some(min) = self.min_years {
            query.push(" AND d.total_years >= ").push_bind(min);
        }
        if let Some(max) = self.max_years {
            query.push(" AND d.total_years <= ").push_bind(max);
        }
        if !self.education_levels.is_empty() {
            let levels: Vec<String> = self
                .education_levels
                .iter()
                .map(|l| l.as_str().to_string())
                .collect();
            query
                .push(" AND d.education_level = ANY(")
                .push_bind(levels)
                .push(")");
        }
        for skill in &self.skills {
            query
                .push(
                    " AND EXISTS (SELECT 1 FROM document_skills ds \
                     JOIN skills s ON s.id = ds.skill_id \
                     WHERE ds.document_id = d.id AND lower(s.name) = lower(",
                )
                .push_bind(skill.trim().to_string())
                .push("))");
        }
        query.push(" ORDER BY d.created_at DESC");
        query
    }
}

pub async fn filter_documents(
    pool: &PgPool,
    owner_id: &str,
    filter: &DocumentFilter,
) -> Result<Vec<DocumentRow>, sqlx::Error> {
    let mut query = filter.build_query(owner_id);
    query.build_query_as::<DocumentRow>().fetch_all(pool).await
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    pub struct StoredDocument {
        pub status: DocumentStatus,
        pub text: String,
        pub skills: SkillSet,
        pub facts: Option<(ExperienceFacts, bool)>,
    }

    /// Records kept in a map. `failing_facts` makes every facts write fail.
    #[derive(Default)]
    pub struct InMemoryDocumentRecords {
        documents: Mutex<HashMap<Uuid, StoredDocument>>,
        failing_facts: bool,
    }

    impl InMemoryDocumentRecords {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_facts() -> Self {
            Self {
                failing_facts: true,
                ..Self::default()
            }
        }

        pub fn get(&self, id: Uuid) -> Option<StoredDocument> {
            self.documents.lock().unwrap().get(&id).cloned()
        }

        pub fn count(&self) -> usize {
            self.documents.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DocumentRecords for InMemoryDocumentRecords {
        async fn store_extracted(
            &self,
            document: &NewDocument<'_>,
            text: &str,
            skills: &SkillSet,
        ) -> Result<(), AppError> {
            self.documents.lock().unwrap().insert(
                document.id,
                StoredDocument {
                    status: DocumentStatus::Extracted,
                    text: text.to_string(),
                    skills: skills.clone(),
                    facts: None,
                },
            );
            Ok(())
        }

        async fn update_facts(
            &self,
            id: Uuid,
            facts: &ExperienceFacts,
            degraded: bool,
        ) -> Result<bool, AppError> {
            if self.failing_facts {
                return Err(AppError::Database(sqlx::Error::PoolTimedOut));
            }
            let mut documents = self.documents.lock().unwrap();
            Ok(match documents.get_mut(&id) {
                Some(document) => {
                    document.status = DocumentStatus::Analyzed;
                    document.facts = Some((*facts, degraded));
                    true
                }
                None => false,
            })
        }

        async fn discard(&self, id: Uuid) -> Result<(), AppError> {
            self.documents.lock().unwrap().remove(&id);
            Ok(())
        }

        async fn mark_error(&self, id: Uuid, _message: &str) -> Result<(), AppError> {
            if let Some(document) = self.documents.lock().unwrap().get_mut(&id) {
                document.status = DocumentStatus::Error;
            }
            Ok(())
        }
    }
}
