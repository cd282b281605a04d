//! Conversation turn storage and bounded context retrieval.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::conversation::ConversationTurn;

#[async_trait]
pub trait TurnStore: Send + Sync {
    /// The newest `limit` turns for a document, newest first.
    async fn recent_turns(
        &self,
        document_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, sqlx::Error>;

    /// Every turn for a document, newest first.
    async fn all_turns(&self, document_id: Uuid) -> Result<Vec<ConversationTurn>, sqlx::Error>;

    async fn append_turn(
        &self,
        document_id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<ConversationTurn, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgTurnStore {
    pool: PgPool,
}

impl PgTurnStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TurnStore for PgTurnStore {
    async fn recent_turns(
        &self,
        document_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM conversation_turns
            WHERE document_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(document_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
    }

    async fn all_turns(&self, document_id: Uuid) -> Result<Vec<ConversationTurn>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM conversation_turns WHERE document_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn append_turn(
        &self,
        document_id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<ConversationTurn, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO conversation_turns (document_id, question, answer)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(document_id)
        .bind(question)
        .bind(answer)
        .fetch_one(&self.pool)
        .await
    }
}

/// Read-only view of the last N turns of a document. Older turns are dropped, not summarized.
#[derive(Clone)]
pub struct ConversationContext {
    store: Arc<dyn TurnStore>,
    limit: usize,
}

impl ConversationContext {
    pub const DEFAULT_LIMIT: usize = 5;

    pub fn new(store: Arc<dyn TurnStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    pub fn store(&self) -> &Arc<dyn TurnStore> {
        &self.store
    }

    /// Newest first.
    pub async fn recent(&self, document_id: Uuid) -> Result<Vec<ConversationTurn>, sqlx::Error> {
        let turns = self.store.recent_turns(document_id, self.limit).await?;
        debug!(%document_id, "Retrieved {} conversation turns", turns.len());
        Ok(turns)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::InMemoryTurnStore;
    use super::*;

    #[tokio::test]
    async fn test_recent_is_bounded_and_newest_first() {
        let store = Arc::new(InMemoryTurnStore::new());
        let document_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        for i in 0..8 {
            store
                .append_turn(document_id, &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }
        store.append_turn(other, "elsewhere", "x").await.unwrap();

        let context = ConversationContext::new(store, ConversationContext::DEFAULT_LIMIT);
        let turns = context.recent(document_id).await.unwrap();
        let questions: Vec<_> = turns.iter().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["q7", "q6", "q5", "q4", "q3"]);
    }

    #[tokio::test]
    async fn test_recent_does_not_modify_history() {
        let store = Arc::new(InMemoryTurnStore::new());
        let document_id = Uuid::new_v4();
        store.append_turn(document_id, "q", "a").await.unwrap();

        let context = ConversationContext::new(store.clone(), 1);
        context.recent(document_id).await.unwrap();
        context.recent(document_id).await.unwrap();
        assert_eq!(store.all_turns(document_id).await.unwrap().len(), 1);
    }
}
