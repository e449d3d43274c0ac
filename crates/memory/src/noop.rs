//! No-op response cache — disables caching entirely.

use async_trait::async_trait;
use chrono::Duration;
use responder_core::cache::{CacheEntry, CacheStats, ResponseCache};
use responder_core::error::MemoryError;

/// A cache that stores nothing; every lookup misses.
pub struct NoopCache;

#[async_trait]
impl ResponseCache for NoopCache {
    fn name(&self) -> &str { "none" }

    async fn lookup(&self, _prompt_hash: &str, _ttl: Duration) -> Result<Option<String>, MemoryError> {
        Ok(None)
    }

    async fn store(
        &self,
        _prompt_hash: &str,
        _prompt: &str,
        _response: &str,
        _model: &str,
    ) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn get(&self, _prompt_hash: &str) -> Result<Option<CacheEntry>, MemoryError> {
        Ok(None)
    }

    async fn clean(&self, _max_age: Duration) -> Result<u64, MemoryError> {
        Ok(0)
    }

    async fn stats(&self) -> Result<CacheStats, MemoryError> {
        Ok(CacheStats::default())
    }
}
