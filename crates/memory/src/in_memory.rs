//! In-memory stores — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use responder_core::cache::{CacheEntry, CacheStats, ResponseCache};
use responder_core::conversation::{ConversationKey, ConversationStore, ConversationTurn};
use responder_core::error::MemoryError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A response cache held in a `HashMap`.
///
/// Every operation takes the write lock for its whole read-modify-write, so
/// concurrent hits on one hash are counted exactly.
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn lookup(&self, prompt_hash: &str, ttl: Duration) -> Result<Option<String>, MemoryError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        Ok(entries
            .get_mut(prompt_hash)
            .filter(|e| e.created_at > now - ttl)
            .map(|e| {
                e.last_used = now;
                e.use_count += 1;
                e.response.clone()
            }))
    }

    async fn store(
        &self,
        prompt_hash: &str,
        prompt: &str,
        response: &str,
        model: &str,
    ) -> Result<(), MemoryError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let use_count = entries.get(prompt_hash).map_or(1, |e| e.use_count + 1);
        entries.insert(
            prompt_hash.to_string(),
            CacheEntry {
                prompt_hash: prompt_hash.to_string(),
                prompt: prompt.to_string(),
                response: response.to_string(),
                model: model.to_string(),
                created_at: now,
                last_used: now,
                use_count,
            },
        );
        Ok(())
    }

    async fn get(&self, prompt_hash: &str) -> Result<Option<CacheEntry>, MemoryError> {
        Ok(self.entries.read().await.get(prompt_hash).cloned())
    }

    async fn clean(&self, max_age: Duration) -> Result<u64, MemoryError> {
        let cutoff = Utc::now() - max_age;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.last_used >= cutoff);
        Ok((before - entries.len()) as u64)
    }

    async fn stats(&self) -> Result<CacheStats, MemoryError> {
        let entries = self.entries.read().await;
        Ok(CacheStats {
            entries: entries.len() as u64,
            total_uses: entries.values().map(|e| u64::from(e.use_count)).sum(),
        })
    }
}

/// Conversation history kept in process memory.
pub struct InMemoryHistory {
    conversations: Arc<RwLock<HashMap<ConversationKey, Vec<ConversationTurn>>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryHistory {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, key: &ConversationKey, turn: ConversationTurn) -> Result<(), MemoryError> {
        self.conversations
            .write()
            .await
            .entry(key.clone())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn history(
        &self,
        key: &ConversationKey,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, MemoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(key)
            .map(|turns| turns[turns.len().saturating_sub(limit)..].to_vec())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use responder_core::conversation::TurnRole;

    #[tokio::test]
    async fn second_lookup_bumps_counter() {
        let cache = InMemoryCache::new();
        cache.store("h", "p", "r", "m").await.unwrap();
        assert_eq!(cache.lookup("h", Duration::hours(24)).await.unwrap().as_deref(), Some("r"));
        assert_eq!(cache.get("h").await.unwrap().unwrap().use_count, 2);
    }

    #[tokio::test]
    async fn expired_entries_miss() {
        let cache = InMemoryCache::new();
        cache.store("h", "p", "r", "m").await.unwrap();
        cache.entries.write().await.get_mut("h").unwrap().created_at = Utc::now() - Duration::hours(25);

        assert!(cache.lookup("h", Duration::hours(24)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clean_and_stats() {
        let cache = InMemoryCache::new();
        cache.store("old", "p", "r", "m").await.unwrap();
        cache.store("new", "p", "r", "m").await.unwrap();
        cache.store("new", "p", "r2", "m").await.unwrap();
        cache.entries.write().await.get_mut("old").unwrap().last_used = Utc::now() - Duration::days(8);

        assert_eq!(cache.stats().await.unwrap().total_uses, 3);
        assert_eq!(cache.clean(Duration::days(7)).await.unwrap(), 1);
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.total_uses, 2);
    }

    #[tokio::test]
    async fn history_returns_most_recent_window() {
        let store = InMemoryHistory::new();
        let key = ConversationKey::new("rina", "100", "200");
        for i in 0..5 {
            store.append(&key, ConversationTurn::incoming(format!("pesan {i}"))).await.unwrap();
        }

        let last = store.history(&key, 2).await.unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].content, "pesan 3");
        assert_eq!(last[1].role, TurnRole::Incoming);

        assert_eq!(store.history(&key, 50).await.unwrap().len(), 5);
        let other = ConversationKey::new("rina", "100", "999");
        assert!(store.history(&other, 10).await.unwrap().is_empty());
    }
}
