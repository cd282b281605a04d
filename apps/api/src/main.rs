mod analysis;
mod auth;
mod config;
mod conversation;
mod db;
mod documents;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod rate_limit;
mod routes;
mod skills;
mod state;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::orchestrator::FactExtractor;
use crate::config::Config;
use crate::conversation::chat::{ChatOrchestrator, ChatSettings};
use crate::conversation::history::{ConversationContext, PgTurnStore};
use crate::db::create_pool;
use crate::documents::repository::PgDocumentRecords;
use crate::documents::storage::S3DocumentStorage;
use crate::llm_client::{ChatBackend, LlmClient};
use crate::rate_limit::middleware::RateLimitState;
use crate::rate_limit::store::RedisWindowStore;
use crate::rate_limit::{RateLimitPolicy, SlidingWindowLimiter};
use crate::routes::build_router;
use crate::skills::taxonomy::SkillTaxonomy;
use crate::state::AppState;

const CHAT_TEMPERATURE: f32 = 0.7;
const RATE_LIMIT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis-backed rate limiting
    let redis = redis::Client::open(config.redis_url.clone())?;
    let limiter = SlidingWindowLimiter::new(Arc::new(RedisWindowStore::new(
        redis,
        RATE_LIMIT_STORE_TIMEOUT,
    )));
    let rate_limit = RateLimitState {
        limiter: Arc::new(limiter),
        policy: RateLimitPolicy {
            limit: config.rate_limit_default,
            window: config.rate_limit_window,
        },
    };
    info!(
        "Rate limit: {} requests per {:?}",
        rate_limit.policy.limit, rate_limit.policy.window
    );

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let storage = S3DocumentStorage::new(s3, config.s3_bucket.clone());
    info!("S3 client initialized");

    // Skill taxonomy is loaded once and shared read-only
    let taxonomy = SkillTaxonomy::load(config.skill_taxonomy_path.as_deref())
        .context("Failed to load skill taxonomy")?;
    info!(
        "Skill taxonomy v{} loaded ({} entries)",
        taxonomy.version(),
        taxonomy.entries().len()
    );

    // Initialize LLM client
    let backend: Arc<dyn ChatBackend> = Arc::new(LlmClient::new(
        config.openai_api_key.clone(),
        &config.openai_base_url,
        config.llm_timeout,
    )?);
    info!("LLM client initialized (model: {})", config.openai_model);

    let facts = FactExtractor::new(backend.clone(), config.openai_model.clone(), config.llm_timeout);
    let chat = ChatOrchestrator::new(
        backend,
        ConversationContext::new(Arc::new(PgTurnStore::new(db.clone())), config.chat_history_limit),
        ChatSettings {
            model: config.openai_model.clone(),
            max_tokens: config.max_tokens,
            analysis_max_tokens: config.analysis_max_tokens,
            temperature: CHAT_TEMPERATURE,
            timeout: config.llm_timeout,
        },
    );

    // Build app state
    let state = AppState {
        records: Arc::new(PgDocumentRecords::new(db.clone())),
        db,
        storage: Arc::new(storage),
        config: config.clone(),
        taxonomy: Arc::new(taxonomy),
        facts,
        chat: Arc::new(chat),
        rate_limit,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict allowed origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resume-api-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
