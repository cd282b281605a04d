use std::sync::Arc;

use sqlx::PgPool;

use crate::analysis::orchestrator::FactExtractor;
use crate::config::Config;
use crate::conversation::chat::ChatOrchestrator;
use crate::documents::repository::DocumentRecords;
use crate::documents::storage::DocumentStorage;
use crate::rate_limit::middleware::RateLimitState;
use crate::skills::taxonomy::SkillTaxonomy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub storage: Arc<dyn DocumentStorage>,
    pub records: Arc<dyn DocumentRecords>,
    pub config: Config,
    /// Loaded once at startup and never mutated.
    pub taxonomy: Arc<SkillTaxonomy>,
    pub facts: FactExtractor,
    pub chat: Arc<ChatOrchestrator>,
    pub rate_limit: RateLimitState,
}
