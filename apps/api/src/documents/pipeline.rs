//! Upload pipeline: validate, store original, extract, tag skills, extract facts.
//!
//! Extraction and persistence failures roll back the document row and the stored
//! original. Fact extraction never fails an upload; it degrades to defaults instead.

use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::orchestrator::{facts_or_default, FactExtractor};
use crate::analysis::ExperienceFacts;
use crate::auth::CallerId;
use crate::documents::repository::{self, DocumentRecords, NewDocument};
use crate::documents::storage::{storage_key, DocumentStorage};
use crate::errors::AppError;
use crate::extraction::{extract_text_blocking, DocumentFormat, ExtractionError};
use crate::models::document::DocumentStatus;
use crate::skills::tagger::{tag_skills, SkillSet};
use crate::skills::taxonomy::SkillTaxonomy;
use crate::state::AppState;

pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub file_name: String,
    pub status: DocumentStatus,
    pub skills: SkillSet,
    pub facts: ExperienceFacts,
    pub facts_degraded: bool,
}

#[derive(Debug, Serialize)]
pub struct ReanalyzeResponse {
    pub document_id: Uuid,
    pub facts: ExperienceFacts,
    pub facts_degraded: bool,
}

pub struct ExtractedDocument {
    pub text: String,
    pub skills: SkillSet,
}

/// Checks the file name, extension and size. Returns the declared format.
pub fn validate_upload(upload: &Upload, max_bytes: usize) -> Result<DocumentFormat, AppError> {
    let file_name = upload.file_name.trim();
    if file_name.is_empty() {
        return Err(AppError::Validation("No selected file".to_string()));
    }
    let format = DocumentFormat::from_file_name(file_name)?;
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if upload.bytes.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "File exceeds the maximum upload size of {max_bytes} bytes"
        )));
    }
    Ok(format)
}

/// Extracts the document text and tags it against the taxonomy.
pub async fn extract_and_tag(
    bytes: Bytes,
    format: DocumentFormat,
    taxonomy: &SkillTaxonomy,
) -> Result<ExtractedDocument, ExtractionError> {
    let text = extract_text_blocking(bytes, format).await?;
    let skills = tag_skills(&text, taxonomy);
    Ok(ExtractedDocument { text, skills })
}

/// Runs fact extraction, falling back to defaults. The second value is set when degraded.
pub async fn analyze_facts(
    extractor: &FactExtractor,
    text: &str,
    today: NaiveDate,
) -> (ExperienceFacts, Option<String>) {
    facts_or_default(extractor.extract(text, today).await)
}

/// What an upload runs against. Borrowed from `AppState` in production.
pub struct Ingestion<'a> {
    pub storage: &'a dyn DocumentStorage,
    pub records: &'a dyn DocumentRecords,
    pub taxonomy: &'a SkillTaxonomy,
    pub facts: &'a FactExtractor,
    pub max_upload_bytes: usize,
}

impl<'a> Ingestion<'a> {
    pub fn from_state(state: &'a AppState) -> Self {
        Self {
            storage: state.storage.as_ref(),
            records: state.records.as_ref(),
            taxonomy: &state.taxonomy,
            facts: &state.facts,
            max_upload_bytes: state.config.max_upload_bytes,
        }
    }

    pub async fn ingest(
        &self,
        owner: &CallerId,
        upload: Upload,
        today: NaiveDate,
    ) -> Result<UploadResponse, AppError> {
        let format = validate_upload(&upload, self.max_upload_bytes)?;
        let document_id = Uuid::new_v4();
        let key = storage_key(owner.as_str(), document_id, format);
        let file_name = upload.file_name.trim().to_string();

        info!(%document_id, owner = owner.as_str(), "Processing upload '{file_name}'");
        self.storage.put(&key, upload.bytes.clone(), format).await?;

        // Extraction runs before any database write so no connection is held across it.
        let extracted = match extract_and_tag(upload.bytes, format, self.taxonomy).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(%document_id, "Extraction failed, removing stored original: {e}");
                self.remove_original(document_id, &key).await;
                return Err(e.into());
            }
        };

        let new_document = NewDocument {
            id: document_id,
            owner_id: owner.as_str(),
            file_name: &file_name,
            format,
            storage_key: &key,
        };
        if let Err(e) = self
            .records
            .store_extracted(&new_document, &extracted.text, &extracted.skills)
            .await
        {
            warn!(%document_id, "Failed to store document, removing stored original: {e}");
            self.remove_original(document_id, &key).await;
            return Err(e);
        }

        let (facts, degraded) = analyze_facts(self.facts, &extracted.text, today).await;
        if let Some(reason) = &degraded {
            warn!(%document_id, "Analysis degraded to defaults: {reason}");
        }

        if let Err(e) = self
            .records
            .update_facts(document_id, &facts, degraded.is_some())
            .await
        {
            error!(%document_id, "Failed to store facts, rolling back upload: {e}");
            self.roll_back(document_id, &key).await;
            return Err(e);
        }

        info!(%document_id, "Document processed");
        Ok(UploadResponse {
            document_id,
            file_name,
            status: DocumentStatus::Analyzed,
            skills: extracted.skills,
            facts,
            facts_degraded: degraded.is_some(),
        })
    }

    /// Undoes a committed upload: the row (skills and turns cascade) and the original.
    /// A row that cannot be removed is marked as errored instead.
    async fn roll_back(&self, document_id: Uuid, key: &str) {
        if let Err(e) = self.records.discard(document_id).await {
            error!(%document_id, "Failed to remove document row: {e}");
            if let Err(mark) = self
                .records
                .mark_error(document_id, "upload did not complete")
                .await
            {
                error!(%document_id, "Failed to mark document as errored: {mark}");
            }
        }
        self.remove_original(document_id, key).await;
    }

    async fn remove_original(&self, document_id: Uuid, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            error!(%document_id, "Failed to remove stored original: {e}");
        }
    }
}

pub async fn ingest_document(
    state: &AppState,
    owner: &CallerId,
    upload: Upload,
) -> Result<UploadResponse, AppError> {
    Ingestion::from_state(state)
        .ingest(owner, upload, Utc::now().date_naive())
        .await
}

/// Re-runs fact extraction on the stored text and swaps the facts in one update.
pub async fn reanalyze_document(
    state: &AppState,
    owner: &CallerId,
    document_id: Uuid,
) -> Result<ReanalyzeResponse, AppError> {
    let document = repository::get_document(&state.db, document_id, owner.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {document_id} not found")))?;
    let text = document.extracted_text.ok_or_else(|| {
        AppError::Validation("No resume text available for analysis".to_string())
    })?;

    let (facts, degraded) = analyze_facts(&state.facts, &text, Utc::now().date_naive()).await;
    if !state
        .records
        .update_facts(document_id, &facts, degraded.is_some())
        .await?
    {
        return Err(AppError::NotFound(format!("Document {document_id} not found")));
    }

    Ok(ReanalyzeResponse {
        document_id,
        facts,
        facts_degraded: degraded.is_some(),
    })
}
