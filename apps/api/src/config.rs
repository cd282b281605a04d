use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::conversation::history::ConversationContext;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Response budget for chat answers.
    pub max_tokens: u32,
    /// Response budget for the whole-resume analysis.
    pub analysis_max_tokens: u32,
    pub llm_timeout: Duration,
    pub rate_limit_default: u64,
    pub rate_limit_window: Duration,
    pub max_upload_bytes: usize,
    pub chat_history_limit: usize,
    pub skill_taxonomy_path: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_model: env_or("OPENAI_MODEL", "gpt-3.5-turbo"),
            max_tokens: parse_env("MAX_TOKENS", 150)?,
            analysis_max_tokens: parse_env("ANALYSIS_MAX_TOKENS", 1000)?,
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 30)?),
            rate_limit_default: parse_env("RATE_LIMIT_DEFAULT", 100)?,
            rate_limit_window: Duration::from_secs(parse_env("RATE_LIMIT_WINDOW", 3600)?),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            chat_history_limit: parse_env(
                "CHAT_HISTORY_LIMIT",
                ConversationContext::DEFAULT_LIMIT,
            )?,
            skill_taxonomy_path: std::env::var("SKILL_TAXONOMY_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty()),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
