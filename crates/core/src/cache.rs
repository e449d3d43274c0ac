//! ResponseCache trait — prompt-hash keyed reply cache.
//!
//! An entry is created on the first miss for a hash, refreshed on every hit
//! (`last_used`, `use_count += 1`) and removed by [`ResponseCache::clean`]
//! once it has gone unused past a retention window. Both the hit bump and the
//! store are single atomic statements per key in every backend.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;

/// A single cached completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub prompt_hash: String,
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub use_count: u32,
}

/// Aggregate numbers for `responder cache stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub total_uses: u64,
}

/// Implementations: SQLite, in-memory (for testing), none (no-op).
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory", "none").
    fn name(&self) -> &str;

    /// Return the cached response if the entry was created within `ttl`,
    /// bumping its usage counter. Expired or absent entries yield `None`.
    async fn lookup(&self, prompt_hash: &str, ttl: Duration) -> std::result::Result<Option<String>, MemoryError>;

    /// Insert or replace the entry for `prompt_hash`. Replacing keeps the
    /// running `use_count` and adds one.
    async fn store(
        &self,
        prompt_hash: &str,
        prompt: &str,
        response: &str,
        model: &str,
    ) -> std::result::Result<(), MemoryError>;

    /// Read an entry without touching its counters.
    async fn get(&self, prompt_hash: &str) -> std::result::Result<Option<CacheEntry>, MemoryError>;

    /// Delete entries whose `last_used` is older than `max_age`. Returns the
    /// number of rows removed.
    async fn clean(&self, max_age: Duration) -> std::result::Result<u64, MemoryError>;

    /// Entry count and summed `use_count`.
    async fn stats(&self) -> std::result::Result<CacheStats, MemoryError>;
}
