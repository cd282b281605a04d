//! Shared window stores for the sliding-window limiter.
//!
//! A store records one timestamp per request in a per-key sorted set and answers
//! the window size. `record` performs prune → add → count → expire as one atomic unit.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Window store timed out after {0:?}")]
    Timeout(Duration),
}

/// State of one key's window right after a request was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Entries inside the window, including the one just recorded.
    pub count: u64,
    /// Oldest entry still inside the window, in milliseconds since the epoch.
    pub oldest_ms: Option<i64>,
}

#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Atomically drops entries at or before `now_ms - window`, records `now_ms`,
    /// refreshes the key's expiry to `window` and returns the resulting window.
    async fn record(
        &self,
        key: &str,
        now_ms: i64,
        window: Duration,
    ) -> Result<WindowSnapshot, StoreError>;

    /// Number of entries inside the window ending at `now_ms`. Read-only.
    async fn count(&self, key: &str, now_ms: i64, window: Duration) -> Result<u64, StoreError>;
}

fn window_ms(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}

/// Redis sorted-set store. Connects lazily and reconnects through `ConnectionManager`.
pub struct RedisWindowStore {
    client: redis::Client,
    connection: RwLock<Option<ConnectionManager>>,
    timeout: Duration,
}

impl RedisWindowStore {
    pub fn new(client: redis::Client, timeout: Duration) -> Self {
        Self {
            client,
            connection: RwLock::new(None),
            timeout,
        }
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut guard = self.connection.write().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = ConnectionManager::new(self.client.clone()).await?;
        info!("Rate limit store connected to Redis");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn record(
        &self,
        key: &str,
        now_ms: i64,
        window: Duration,
    ) -> Result<WindowSnapshot, StoreError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let window_ms = window_ms(window);
            // Members must be unique or same-millisecond requests would collapse.
            let member = format!("{now_ms}-{}", Uuid::new_v4());

            let (count, oldest): (u64, Vec<(String, f64)>) = redis::pipe()
                .atomic()
                .cmd("ZREMRANGEBYSCORE")
                .arg(key)
                .arg("-inf")
                .arg(now_ms.saturating_sub(window_ms))
                .ignore()
                .cmd("ZADD")
                .arg(key)
                .arg(now_ms)
                .arg(&member)
                .ignore()
                .cmd("ZCARD")
                .arg(key)
                .cmd("PEXPIRE")
                .arg(key)
                .arg(window_ms)
                .ignore()
                .cmd("ZRANGE")
                .arg(key)
                .arg(0)
                .arg(0)
                .arg("WITHSCORES")
                .query_async(&mut conn)
                .await?;

            debug!(key, count, "Recorded request in window");
            Ok(WindowSnapshot {
                count,
                oldest_ms: oldest.first().map(|(_, score)| *score as i64),
            })
        })
        .await
    }

    async fn count(&self, key: &str, now_ms: i64, window: Duration) -> Result<u64, StoreError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let lower = format!("({}", now_ms.saturating_sub(window_ms(window)));
            let count: u64 = redis::cmd("ZCOUNT")
                .arg(key)
                .arg(lower)
                .arg("+inf")
                .query_async(&mut conn)
                .await?;
            Ok(count)
        })
        .await
    }
}
