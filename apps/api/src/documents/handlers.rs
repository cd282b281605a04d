use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::analysis::ExperienceFacts;
use crate::auth::CallerId;
use crate::documents::pipeline::{
    ingest_document, reanalyze_document, ReanalyzeResponse, Upload, UploadResponse,
};
use crate::documents::repository::{self, DocumentFilter};
use crate::errors::AppError;
use crate::models::document::DocumentRow;
use crate::skills::repository::get_document_skills;
use crate::skills::tagger::SkillSet;
use crate::state::AppState;

#[derive(Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: DocumentRow,
    pub facts: Option<ExperienceFacts>,
    pub skills: SkillSet,
}

#[derive(Serialize)]
pub struct DocumentSkillsResponse {
    pub document_id: Uuid,
    pub skills: SkillSet,
}

async fn owned_document(
    state: &AppState,
    caller: &CallerId,
    id: Uuid,
) -> Result<DocumentRow, AppError> {
    repository::get_document(&state.db, id, caller.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))
}

/// POST /api/v1/documents
pub async fn handle_upload(
    State(state): State<AppState>,
    caller: CallerId,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Read error: {e}")))?;
        upload = Some(Upload { file_name, bytes });
    }

    let upload = upload.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
    let response = ingest_document(&state, &caller, upload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/documents
pub async fn handle_list(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<Json<Vec<DocumentRow>>, AppError> {
    Ok(Json(
        repository::list_documents(&state.db, caller.as_str()).await?,
    ))
}

/// GET /api/v1/documents/:id
pub async fn handle_get(
    State(state): State<AppState>,
    caller: CallerId,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentDetail>, AppError> {
    let document = owned_document(&state, &caller, id).await?;
    let skills = get_document_skills(&state.db, id).await?;
    Ok(Json(DocumentDetail {
        facts: document.facts(),
        document,
        skills,
    }))
}

/// GET /api/v1/documents/:id/skills
pub async fn handle_get_skills(
    State(state): State<AppState>,
    caller: CallerId,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentSkillsResponse>, AppError> {
    owned_document(&state, &caller, id).await?;
    let skills = get_document_skills(&state.db, id).await?;
    Ok(Json(DocumentSkillsResponse {
        document_id: id,
        skills,
    }))
}

/// DELETE /api/v1/documents/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    caller: CallerId,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let key = repository::delete_document(&state.db, id, caller.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))?;

    // The row is gone; a leftover object is only logged.
    if let Err(e) = state.storage.delete(&key).await {
        warn!(document_id = %id, "Could not delete stored original: {e}");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/documents/filter
pub async fn handle_filter(
    State(state): State<AppState>,
    caller: CallerId,
    Json(filter): Json<DocumentFilter>,
) -> Result<Json<Vec<DocumentRow>>, AppError> {
    filter.validate().map_err(AppError::Validation)?;
    Ok(Json(
        repository::filter_documents(&state.db, caller.as_str(), &filter).await?,
    ))
}

/// POST /api/v1/documents/:id/reanalyze
pub async fn handle_reanalyze(
    State(state): State<AppState>,
    caller: CallerId,
    Path(id): Path<Uuid>,
) -> Result<Json<ReanalyzeResponse>, AppError> {
    Ok(Json(reanalyze_document(&state, &caller, id).await?))
}
