//! Bounded response cache for completions using moka

use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

/// Caches completion text by model and normalized prompt
pub struct ResponseCache {
    cache: Cache<String, String>,
}

impl ResponseCache {
    /// Create a new cache with specified capacity and TTL
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        info!("Initializing response cache with max_size={}, ttl={:?}", max_size, ttl);

        let cache = Cache::builder()
            .max_capacity(max_size as u64)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Cache key: SHA-256 of model and prompt
    pub fn key(model: &str, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(prompt.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn get(&self, model: &str, prompt: &str) -> Option<String> {
        let result = self.cache.get(&Self::key(model, prompt)).await;
        if result.is_some() {
            debug!("Response cache hit for model {}", model);
        }
        result
    }

    pub async fn put(&self, model: &str, prompt: &str, response: String) {
        self.cache.insert(Self::key(model, prompt), response).await;
    }

    #[cfg(test)]
    async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
