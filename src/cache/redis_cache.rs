// Redis-backed result cache
//
// GET / SETEX on a shared ConnectionManager. Every operation is time-bounded
// so a stalled server cannot hold up a dispatch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::timeout;

use super::{Fingerprint, ResultCache};
use crate::tools::ToolResponse;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const OP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect and verify the server answers PING
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("Invalid Redis URL: {}", url))?;

        let mut conn = timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .context("Timed out connecting to Redis")?
            .context("Failed to connect to Redis")?;

        let pong: String = timeout(OP_TIMEOUT, redis::cmd("PING").query_async(&mut conn))
            .await
            .context("Timed out waiting for Redis PING")?
            .context("Redis PING failed")?;
        tracing::debug!(reply = %pong, "Redis answered PING");

        Ok(Self { conn })
    }

    async fn try_get(&self, key: &Fingerprint) -> Result<Option<ToolResponse>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = timeout(OP_TIMEOUT, conn.get(key.as_str()))
            .await
            .context("Redis GET timed out")??;

        match raw {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).context("Corrupt cached response")?,
            )),
            None => Ok(None),
        }
    }

    async fn try_put(&self, key: &Fingerprint, response: &ToolResponse, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(response)?;
        let mut conn = self.conn.clone();
        let _: () = timeout(OP_TIMEOUT, conn.set_ex(key.as_str(), payload, ttl.as_secs().max(1)))
            .await
            .context("Redis SETEX timed out")??;
        Ok(())
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: &Fingerprint) -> Option<ToolResponse> {
        match self.try_get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn put(&self, key: &Fingerprint, response: &ToolResponse, ttl: Duration) {
        if let Err(e) = self.try_put(key, response, ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed, dropping result");
        }
    }

    async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        let reply: Result<redis::RedisResult<String>, _> =
            timeout(OP_TIMEOUT, redis::cmd("PING").query_async(&mut conn)).await;
        matches!(reply, Ok(Ok(_)))
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
