//! Completion Client — cache check, provider call with retry, fixed fallback.
//!
//! [`CompletionClient::complete`] returns a `String`, never an error: cache
//! failures count as misses, provider failures are retried with exponential
//! backoff, and exhausted retries yield the fallback message. Backoff waits
//! are `tokio::time::sleep`, so other chat tasks keep running.

use crate::prompt::token;
use chrono::Duration as TtlDuration;
use responder_core::cache::ResponseCache;
use responder_core::message::ChatMessage;
use responder_core::provider::{Provider, ProviderRequest};
use responder_memory::prompt_hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// System line sent ahead of every prompt.
pub const SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

/// Reply used when every attempt failed.
pub const DEFAULT_FALLBACK: &str =
    "Maaf, saya sedang mengalami masalah teknis. Silakan coba lagi nanti.";

pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    cache: Arc<dyn ResponseCache>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    ttl: TtlDuration,
    max_retries: u32,
    backoff_base: Duration,
    fallback: String,
}

impl CompletionClient {
    /// A client with 24h cache TTL, 3 attempts and a 1s backoff base.
    pub fn new(
        provider: Arc<dyn Provider>,
        cache: Arc<dyn ResponseCache>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            cache,
            model: model.into(),
            temperature: 0.7,
            max_tokens: Some(1000),
            ttl: TtlDuration::hours(24),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }

    pub fn from_config(
        provider: Arc<dyn Provider>,
        cache: Arc<dyn ResponseCache>,
        config: &responder_config::AppConfig,
    ) -> Self {
        Self::new(provider, cache, &config.default_model)
            .with_sampling(config.default_temperature, Some(config.default_max_tokens))
            .with_ttl(TtlDuration::hours(i64::from(config.cache.ttl_hours)))
            .with_retry(
                config.completion.max_retries,
                Duration::from_millis(config.completion.backoff_base_ms),
            )
            .with_fallback(&config.completion.fallback_message)
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_ttl(mut self, ttl: TtlDuration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Total attempts (at least one) and the backoff unit.
    pub fn with_retry(mut self, max_retries: u32, backoff_base: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    /// Wait after failed attempt `attempt` (1-based): `base × 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Answer `prompt`, from cache when possible.
    pub async fn complete(&self, prompt: &str) -> String {
        let hash = prompt_hash(prompt);

        match self.cache.lookup(&hash, self.ttl).await {
            Ok(Some(cached)) => {
                info!(hash = %&hash[..12], "Serving response from cache");
                return cached;
            }
            Ok(None) => debug!(hash = %&hash[..12], "Cache miss"),
            Err(e) => warn!(hash = %&hash[..12], error = %e, "Cache lookup failed, treating as miss"),
        }

        let Some(response) = self.call_with_retry(prompt).await else {
            return self.fallback.clone();
        };

        if let Err(e) = self.cache.store(&hash, prompt, &response, &self.model).await {
            warn!(hash = %&hash[..12], error = %e, "Failed to cache response");
        }
        response
    }

    async fn call_with_retry(&self, prompt: &str) -> Option<String> {
        let messages = vec![ChatMessage::system(SYSTEM_MESSAGE), ChatMessage::user(prompt)];
        let estimated: usize = messages.iter().map(token::estimate_message_tokens).sum();

        for attempt in 1..=self.max_retries {
            let request = ProviderRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            debug!(
                provider = self.provider.name(),
                model = %self.model,
                attempt,
                estimated_tokens = estimated,
                "Calling completion provider"
            );

            match self.provider.complete(request).await {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        debug!(
                            prompt_tokens = usage.prompt_tokens,
                            completion_tokens = usage.completion_tokens,
                            "Completion usage"
                        );
                    }
                    return Some(response.message.content);
                }
                Err(e) if attempt < self.max_retries => {
                    let wait = self.backoff_delay(attempt);
                    warn!(
                        attempt,
                        error = %e,
                        wait_ms = wait.as_millis() as u64,
                        "Completion failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Completion failed, giving up");
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use responder_core::error::{MemoryError, ProviderError};
    use responder_core::cache::{CacheEntry, CacheStats};
    use responder_memory::InMemoryCache;

    fn client(provider: Arc<ScriptedProvider>, cache: Arc<dyn ResponseCache>) -> CompletionClient {
        CompletionClient::new(provider, cache, "gpt-3.5-turbo")
    }

    #[tokio::test]
    async fn second_identical_prompt_is_served_from_cache() {
        let provider = Arc::new(ScriptedProvider::answering("Minimal Rp 1 juta."));
        let cache = Arc::new(InMemoryCache::new());
        let client = client(provider.clone(), cache.clone());

        let first = client.complete("User: Halo\nAssistant:").await;
        let second = client.complete("User: Halo\nAssistant:").await;

        assert_eq!(first, "Minimal Rp 1 juta.");
        assert_eq!(second, first);
        assert_eq!(provider.call_count(), 1);

        let entry = cache
            .get(&prompt_hash("User: Halo\nAssistant:"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.use_count, 2);
        assert_eq!(entry.model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn request_carries_system_line_and_prompt() {
        let provider = Arc::new(ScriptedProvider::answering("ok"));
        let client = client(provider.clone(), Arc::new(InMemoryCache::new()))
            .with_sampling(0.2, Some(50));
        client.complete("PROMPT").await;

        let request = provider.last_request().unwrap();
        assert_eq!(request.messages[0], ChatMessage::system(SYSTEM_MESSAGE));
        assert_eq!(request.messages[1], ChatMessage::user("PROMPT"));
        assert_eq!(request.max_tokens, Some(50));
    }

    #[tokio::test]
    async fn permanent_failure_returns_fallback_after_all_attempts() {
        tokio::time::pause();
        let provider = Arc::new(ScriptedProvider::failing());
        let cache = Arc::new(InMemoryCache::new());
        let client = client(provider.clone(), cache.clone());

        let start = tokio::time::Instant::now();
        let reply = client.complete("anything").await;

        assert_eq!(reply, DEFAULT_FALLBACK);
        assert_eq!(provider.call_count(), 3);
        // 2s after attempt 1, 4s after attempt 2, none after the last
        assert_eq!(start.elapsed().as_secs(), 6);
        assert_eq!(cache.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn recovers_on_later_attempt() {
        tokio::time::pause();
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Timeout("30s".into())),
            Ok("Berhasil".into()),
        ]));
        let client = client(provider.clone(), Arc::new(InMemoryCache::new()));

        assert_eq!(client.complete("p").await, "Berhasil");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn configured_attempts_and_fallback() {
        tokio::time::pause();
        let provider = Arc::new(ScriptedProvider::failing());
        let client = client(provider.clone(), Arc::new(InMemoryCache::new()))
            .with_retry(5, Duration::from_millis(10))
            .with_fallback("Coba lagi ya.");

        assert_eq!(client.complete("p").await, "Coba lagi ya.");
        assert_eq!(provider.call_count(), 5);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let provider = Arc::new(ScriptedProvider::failing());
        let client = client(provider, Arc::new(InMemoryCache::new()));
        assert_eq!(client.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(client.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(client.backoff_delay(3), Duration::from_secs(8));
    }

    struct BrokenCache;

    #[async_trait::async_trait]
    impl ResponseCache for BrokenCache {
        fn name(&self) -> &str {
            "broken"
        }
        async fn lookup(&self, _: &str, _: TtlDuration) -> Result<Option<String>, MemoryError> {
            Err(MemoryError::QueryFailed("disk I/O error".into()))
        }
        async fn store(&self, _: &str, _: &str, _: &str, _: &str) -> Result<(), MemoryError> {
            Err(MemoryError::Storage("read-only".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<CacheEntry>, MemoryError> {
            Ok(None)
        }
        async fn clean(&self, _: TtlDuration) -> Result<u64, MemoryError> {
            Ok(0)
        }
        async fn stats(&self) -> Result<CacheStats, MemoryError> {
            Ok(CacheStats::default())
        }
    }

    #[tokio::test]
    async fn cache_failures_bypass_the_cache() {
        let provider = Arc::new(ScriptedProvider::answering("langsung"));
        let client = client(provider.clone(), Arc::new(BrokenCache));

        assert_eq!(client.complete("p").await, "langsung");
        assert_eq!(client.complete("p").await, "langsung");
        assert_eq!(provider.call_count(), 2);
    }
}
