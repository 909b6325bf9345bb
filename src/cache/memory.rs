// In-process result cache backed by DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{Fingerprint, ResultCache};
use crate::tools::ToolResponse;

#[derive(Debug, Clone)]
struct Entry {
    response: ToolResponse,
    expires_at: Instant,
}

/// Expiring map shared across requests
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored (possibly expired) entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            tracing::debug!(removed, active = self.entries.len(), "Purged expired cache entries");
        }
        removed
    }

    /// Periodically purge expired entries in the background
    pub fn start_purge_task(&self, every: Duration) {
        let cache = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                cache.purge_expired();
            }
        });
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &Fingerprint) -> Option<ToolResponse> {
        let hit = self.entries.get(key.as_str()).map(|entry| entry.clone())?;

        if hit.expires_at <= Instant::now() {
            self.entries
                .remove_if(key.as_str(), |_, entry| entry.expires_at <= Instant::now());
            return None;
        }
        Some(hit.response)
    }

    async fn put(&self, key: &Fingerprint, response: &ToolResponse, ttl: Duration) {
        self.entries.insert(
            key.as_str().to_string(),
            Entry {
                response: response.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn ping(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
