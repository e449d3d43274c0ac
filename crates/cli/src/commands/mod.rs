//! Command implementations and the shared application-root wiring.

pub mod ask;
pub mod cache;
pub mod inspect;
pub mod knowledge;
pub mod onboard;

use responder_agent::ResponseEngine;
use responder_config::{AppConfig, CacheConfig};
use responder_core::cache::ResponseCache;
use responder_core::conversation::ConversationKey;
use responder_memory::{FileHistory, InMemoryCache, NoopCache, SqliteCache};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Which conversation a message belongs to.
#[derive(clap::Args, Debug, Clone)]
pub struct ConversationArgs {
    /// Answering account
    #[arg(short, long, default_value = "default")]
    pub identity: String,

    /// Chat the message arrived in
    #[arg(long, default_value = "cli")]
    pub chat: String,

    /// Sender of the message
    #[arg(long, default_value = "cli")]
    pub user: String,
}

impl ConversationArgs {
    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(&self.identity, &self.chat, &self.user)
    }
}

pub fn load_config(path: Option<&Path>) -> CmdResult<AppConfig> {
    let config = match path {
        Some(p) => AppConfig::load_with_env(p),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

/// The response cache selected by `[cache]`.
pub async fn open_cache(config: &CacheConfig) -> CmdResult<Arc<dyn ResponseCache>> {
    if !config.enabled {
        return Ok(Arc::new(NoopCache));
    }
    let cache: Arc<dyn ResponseCache> = match config.backend.as_str() {
        "sqlite" => Arc::new(SqliteCache::open(&config.path).await?),
        "memory" => Arc::new(InMemoryCache::new()),
        "none" => Arc::new(NoopCache),
        other => return Err(format!("Unknown cache backend: {other}").into()),
    };
    Ok(cache)
}

/// Wire the full engine for `identity`, using that account's API key.
pub async fn build_engine(config: &AppConfig, identity: &str) -> CmdResult<ResponseEngine> {
    let api_key = config.api_key_for(identity);
    let router = responder_providers::build_from_config(config, api_key.as_deref());
    let provider = router
        .default()
        .ok_or_else(|| format!("Provider '{}' is not available", config.default_provider))?;

    let cache = open_cache(&config.cache).await?;
    let history = Arc::new(FileHistory::new(&config.history.dir));
    debug!(
        provider = provider.name(),
        cache = cache.name(),
        history = %config.history.dir.display(),
        "Engine wired"
    );

    Ok(ResponseEngine::from_config(config, provider, cache, history))
}
