// Result cache
//
// Memoizes successful tool responses by request fingerprint. Backends never
// surface errors: an unreachable store behaves like an empty one.

mod fingerprint;
mod memory;
mod redis_cache;

pub use fingerprint::{fingerprint, fingerprint_request, Fingerprint, NAMESPACE};
pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheBackend, GatewayConfig};
use crate::tools::ToolResponse;

/// Key-value store with expiry for tool responses
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Cached response, or None on miss, expiry or backend failure
    async fn get(&self, key: &Fingerprint) -> Option<ToolResponse>;

    /// Store a response for `ttl`; failures are logged and dropped
    async fn put(&self, key: &Fingerprint, response: &ToolResponse, ttl: Duration);

    /// Whether the backing store currently answers
    async fn ping(&self) -> bool;

    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;
}

/// Cache that stores nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl ResultCache for NoopCache {
    async fn get(&self, _key: &Fingerprint) -> Option<ToolResponse> {
        None
    }

    async fn put(&self, _key: &Fingerprint, _response: &ToolResponse, _ttl: Duration) {}

    async fn ping(&self) -> bool {
        false
    }

    fn backend(&self) -> &'static str {
        "disabled"
    }
}

/// Build the configured cache, degrading to [`NoopCache`] when Redis is down
pub async fn connect_cache(config: &GatewayConfig) -> Arc<dyn ResultCache> {
    match config.cache_backend {
        CacheBackend::Disabled => {
            tracing::info!("Result cache disabled by configuration");
            Arc::new(NoopCache)
        }
        CacheBackend::Memory => {
            tracing::info!("Using in-process result cache");
            let cache = MemoryCache::new();
            cache.start_purge_task(Duration::from_secs(60));
            Arc::new(cache)
        }
        CacheBackend::Redis => match RedisCache::connect(&config.redis_url()).await {
            Ok(cache) => {
                tracing::info!(url = %config.redis_url(), "Redis connected successfully");
                Arc::new(cache)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis not available. Caching disabled.");
                Arc::new(NoopCache)
            }
        },
    }
}
