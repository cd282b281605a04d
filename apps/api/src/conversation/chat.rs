//! Chat orchestration: prompt composition, backend call, response normalization and
//! turn persistence.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::conversation::history::ConversationContext;
use crate::conversation::prompts::{analysis_message, question_message, CHAT_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::prompts::{strip_stop_marker, STOP_MARKER};
use crate::llm_client::{complete_text_within, ChatBackend, ChatMessage, ChatRequest, LlmError};
use crate::models::conversation::ConversationTurn;

const IMPROVEMENT_KEYWORDS: [&str; 4] = ["improve", "enhancement", "suggestion", "better"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    General,
    Improvement,
}

/// Keyword match on the lowercased question.
pub fn classify_question(question: &str) -> QuestionKind {
    let lowered = question.to_lowercase();
    if IMPROVEMENT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        QuestionKind::Improvement
    } else {
        QuestionKind::General
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("Backend contract violation: {0}")]
    BackendContract(String),

    #[error("Backend call failed: {0}")]
    Backend(#[source] LlmError),

    #[error("Failed to read or save conversation: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl From<LlmError> for ChatError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::NoChoices | LlmError::MissingMessage | LlmError::EmptyContent => {
                ChatError::BackendContract(e.to_string())
            }
            other => ChatError::Backend(other),
        }
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::EmptyQuestion => AppError::Validation("Question must not be empty".to_string()),
            ChatError::BackendContract(msg) => AppError::BackendContract(msg),
            ChatError::Backend(e) => AppError::Llm(e.to_string()),
            ChatError::Persistence(e) => AppError::Database(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub max_tokens: u32,
    pub analysis_max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

pub struct ChatOrchestrator {
    backend: Arc<dyn ChatBackend>,
    context: ConversationContext,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        context: ConversationContext,
        settings: ChatSettings,
    ) -> Self {
        Self {
            backend,
            context,
            settings,
        }
    }

    /// Answers a question about a document and appends the turn to its history.
    pub async fn answer_question(
        &self,
        document_id: Uuid,
        document_text: &str,
        question: &str,
    ) -> Result<ConversationTurn, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        let mut history = self.context.recent(document_id).await?;
        history.reverse();
        let kind = classify_question(question);
        info!(
            %document_id,
            ?kind,
            history = history.len(),
            "Answering question"
        );

        let request = self.request(
            question_message(
                document_text,
                &history,
                question,
                kind == QuestionKind::Improvement,
            ),
            self.settings.max_tokens,
        );
        let answer = self.complete(&request).await?;

        let turn = self
            .context
            .store()
            .append_turn(document_id, question, &answer)
            .await?;
        Ok(turn)
    }

    /// Open-ended evaluation of the whole document. Not recorded in the history.
    pub async fn analyze_document(&self, document_text: &str) -> Result<String, ChatError> {
        let request = self.request(
            analysis_message(document_text),
            self.settings.analysis_max_tokens,
        );
        self.complete(&request).await
    }

    pub async fn history(&self, document_id: Uuid) -> Result<Vec<ConversationTurn>, ChatError> {
        Ok(self.context.store().all_turns(document_id).await?)
    }

    fn request(&self, user_message: String, max_tokens: u32) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(CHAT_SYSTEM),
                ChatMessage::user(user_message),
            ],
            max_tokens: Some(max_tokens),
            temperature: self.settings.temperature,
            stop: vec![STOP_MARKER.to_string()],
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let raw = complete_text_within(self.backend.as_ref(), request, self.settings.timeout)
            .await
            .map_err(|e| {
                error!("Chat completion failed: {e}");
                ChatError::from(e)
            })?;

        let answer = strip_stop_marker(&raw);
        if answer.is_empty() {
            return Err(ChatError::BackendContract(
                "response was empty after removing the stop marker".to_string(),
            ));
        }
        info!("Received {} characters from backend", answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::history::test_support::InMemoryTurnStore;
    use crate::conversation::history::TurnStore;
    use crate::conversation::prompts::IMPROVEMENT_INSTRUCTION;
    use crate::llm_client::test_support::{Scripted, ScriptedBackend};
    use crate::llm_client::{ChatResponse, Choice, ChoiceMessage};

    const RESUME: &str = "Jane Doe\nSenior Engineer at Acme Corp\nPython, Rust";

    fn settings() -> ChatSettings {
        ChatSettings {
            model: "test-model".to_string(),
            max_tokens: 150,
            analysis_max_tokens: 1000,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }

    fn orchestrator(backend: ScriptedBackend) -> (ChatOrchestrator, Arc<ScriptedBackend>, Arc<InMemoryTurnStore>) {
        let backend = Arc::new(backend);
        let store = Arc::new(InMemoryTurnStore::new());
        let context = ConversationContext::new(store.clone(), ConversationContext::DEFAULT_LIMIT);
        (
            ChatOrchestrator::new(backend.clone(), context, settings()),
            backend,
            store,
        )
    }

    #[test]
    fn test_classify_question() {
        assert_eq!(
            classify_question("How can I IMPROVE my resume?"),
            QuestionKind::Improvement
        );
        assert_eq!(
            classify_question("Any suggestions for the summary?"),
            QuestionKind::Improvement
        );
        assert_eq!(
            classify_question("What makes this CV better?"),
            QuestionKind::Improvement
        );
        assert_eq!(
            classify_question("Where did Jane work?"),
            QuestionKind::General
        );
    }

    #[tokio::test]
    async fn test_answer_strips_marker_and_persists_turn() {
        let (chat, backend, store) = orchestrator(
            ScriptedBackend::new().then(Scripted::Text("Jane works at Acme Corp. END_RESPONSE".into())),
        );
        let document_id = Uuid::new_v4();

        let turn = chat
            .answer_question(document_id, RESUME, "  Where does Jane work? ")
            .await
            .unwrap();
        assert_eq!(turn.answer, "Jane works at Acme Corp.");
        assert_eq!(turn.question, "Where does Jane work?");
        assert_eq!(store.all_turns(document_id).await.unwrap().len(), 1);

        let request = &backend.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, CHAT_SYSTEM);
        assert!(request.messages[1].content.contains(RESUME));
        assert!(request.messages[1].content.ends_with("End your response with END_RESPONSE."));
        assert_eq!(request.stop, vec![STOP_MARKER.to_string()]);
        assert_eq!(request.max_tokens, Some(150));
        assert_eq!(request.temperature, 0.7);
        assert!(!request.messages[1].content.contains(IMPROVEMENT_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_improvement_question_adds_bullet_instruction() {
        let (chat, backend, _) =
            orchestrator(ScriptedBackend::new().then(Scripted::Text("• Add metrics".into())));
        chat.answer_question(Uuid::new_v4(), RESUME, "How do I improve this?")
            .await
            .unwrap();
        assert!(backend.requests()[0].messages[1]
            .content
            .contains(IMPROVEMENT_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_prior_turns_are_included_oldest_first() {
        let (chat, backend, store) =
            orchestrator(ScriptedBackend::new().then(Scripted::Text("Third answer".into())));
        let document_id = Uuid::new_v4();
        store.append_turn(document_id, "first?", "one").await.unwrap();
        store.append_turn(document_id, "second?", "two").await.unwrap();

        chat.answer_question(document_id, RESUME, "third?").await.unwrap();

        let prompt = &backend.requests()[0].messages[1].content;
        let first = prompt.find("Q: first?").unwrap();
        let second = prompt.find("Q: second?").unwrap();
        assert!(first < second);
        assert!(prompt.find("Question: third?").unwrap() > second);
    }

    #[tokio::test]
    async fn test_marker_only_response_is_contract_violation_and_not_saved() {
        let (chat, _, store) =
            orchestrator(ScriptedBackend::new().then(Scripted::Text("END_RESPONSE".into())));
        let document_id = Uuid::new_v4();

        let result = chat.answer_question(document_id, RESUME, "Anything?").await;
        assert!(matches!(result, Err(ChatError::BackendContract(_))));
        assert!(store.all_turns(document_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_choices_is_contract_violation() {
        let (chat, _, _) = orchestrator(ScriptedBackend::new().then(Scripted::Response(
            ChatResponse {
                choices: vec![],
                usage: None,
            },
        )));
        let result = chat.answer_question(Uuid::new_v4(), RESUME, "Anything?").await;
        assert!(matches!(result, Err(ChatError::BackendContract(_))));
    }

    #[tokio::test]
    async fn test_null_content_is_contract_violation() {
        let (chat, _, _) = orchestrator(ScriptedBackend::new().then(Scripted::Response(
            ChatResponse {
                choices: vec![Choice {
                    message: Some(ChoiceMessage { content: None }),
                }],
                usage: None,
            },
        )));
        let result = chat.analyze_document(RESUME).await;
        assert!(matches!(result, Err(ChatError::BackendContract(_))));
    }

    #[tokio::test]
    async fn test_empty_question_rejected_without_backend_call() {
        let (chat, backend, _) = orchestrator(ScriptedBackend::new());
        let result = chat.answer_question(Uuid::new_v4(), RESUME, "   ").await;
        assert!(matches!(result, Err(ChatError::EmptyQuestion)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_analysis_uses_larger_budget_and_is_not_persisted() {
        let (chat, backend, store) = orchestrator(
            ScriptedBackend::new().then(Scripted::Text("Overall strong.\nEND_RESPONSE".into())),
        );
        let analysis = chat.analyze_document(RESUME).await.unwrap();
        assert_eq!(analysis, "Overall strong.");

        let request = &backend.requests()[0];
        assert_eq!(request.max_tokens, Some(1000));
        assert!(request.messages[1].content.contains("Overall impression"));
        assert!(store.all_turns(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_timeout_is_backend_error() {
        let (chat, _, _) = orchestrator(ScriptedBackend::new().then(Scripted::Hang));
        let result = chat.answer_question(Uuid::new_v4(), RESUME, "Anything?").await;
        assert!(matches!(result, Err(ChatError::Backend(LlmError::Timeout(_)))));
    }
}
