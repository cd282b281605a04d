use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CallerId;
use crate::documents::repository::get_document;
use crate::errors::AppError;
use crate::models::conversation::ConversationTurn;
use crate::rate_limit::rate_limit_key;
use crate::state::AppState;

pub const ASK_ROUTE: &str = "/api/v1/chat/ask";

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub document_id: Uuid,
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub document_id: Uuid,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub document_id: Uuid,
    pub analysis: String,
}

/// Text of a document owned by the caller.
async fn document_text(state: &AppState, caller: &CallerId, id: Uuid) -> Result<String, AppError> {
    get_document(&state.db, id, caller.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))?
        .extracted_text
        .ok_or_else(|| AppError::Validation("No resume text available for analysis".to_string()))
}

/// POST /api/v1/chat/ask
pub async fn handle_ask(
    State(state): State<AppState>,
    caller: CallerId,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::Validation("Question is required".to_string()));
    }
    let text = document_text(&state, &caller, req.document_id).await?;
    let turn = state
        .chat
        .answer_question(req.document_id, &text, &req.question)
        .await?;

    Ok(Json(AskResponse {
        document_id: turn.document_id,
        question: turn.question,
        answer: turn.answer,
        created_at: turn.created_at,
    }))
}

/// GET /api/v1/chat/analyze/:id
pub async fn handle_analyze(
    State(state): State<AppState>,
    caller: CallerId,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let text = document_text(&state, &caller, id).await?;
    let analysis = state.chat.analyze_document(&text).await?;
    Ok(Json(AnalysisResponse {
        document_id: id,
        analysis,
    }))
}

/// GET /api/v1/chat/history/:id
pub async fn handle_history(
    State(state): State<AppState>,
    caller: CallerId,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ConversationTurn>>, AppError> {
    get_document(&state.db, id, caller.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))?;
    Ok(Json(state.chat.history(id).await?))
}

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub route: &'static str,
    pub limit: u64,
    /// `None` when the limiter store is unavailable.
    pub remaining: Option<u64>,
}

/// GET /api/v1/chat/quota
/// Remaining question quota for the caller. Does not consume any quota.
pub async fn handle_quota(
    State(state): State<AppState>,
    caller: CallerId,
) -> Json<QuotaResponse> {
    let policy = state.rate_limit.policy;
    let key = rate_limit_key(ASK_ROUTE, caller.as_str());
    Json(QuotaResponse {
        route: ASK_ROUTE,
        limit: policy.limit,
        remaining: state.rate_limit.limiter.remaining(&key, policy).await,
    })
}
