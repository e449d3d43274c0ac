//! Configuration loading, validation, and management for the responder.
//!
//! Loads configuration from `~/.jtrade-responder/config.toml` (or an explicit
//! path) with environment variable overrides. Validates all settings at
//! startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider or per-account)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default completion provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Knowledge base and embedding index
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Snippet retrieval for prompts
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Prompt assembly
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Completion retry behaviour
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Response cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Persona override sources
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Conversation history store
    #[serde(default)]
    pub history: HistoryConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("knowledge", &self.knowledge)
            .field("retrieval", &self.retrieval)
            .field("prompt", &self.prompt)
            .field("completion", &self.completion)
            .field("cache", &self.cache)
            .field("persona", &self.persona)
            .field("history", &self.history)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory of `*.json` knowledge documents
    #[serde(default = "default_knowledge_dir")]
    pub dir: PathBuf,

    /// Persisted `dotted_path -> [f32; 128]` map
    #[serde(default = "default_embedding_cache")]
    pub embedding_cache: PathBuf,

    /// Entries with text this short (in characters) are not indexed
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,

    /// "token_hash" or "digest"
    #[serde(default = "default_embedder")]
    pub embedder: String,
}

fn default_knowledge_dir() -> PathBuf {
    PathBuf::from("data/knowledge_base")
}
fn default_embedding_cache() -> PathBuf {
    PathBuf::from("data/embeddings/cache.json")
}
fn default_min_text_len() -> usize {
    10
}
fn default_embedder() -> String {
    "token_hash".into()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: default_knowledge_dir(),
            embedding_cache: default_embedding_cache(),
            min_text_len: default_min_text_len(),
            embedder: default_embedder(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Token ceiling for the retrieved-knowledge section (~4 chars per token)
    #[serde(default = "default_retrieval_tokens")]
    pub max_tokens: usize,

    /// Append intent labels and the persona context to the retrieval query
    #[serde(default)]
    pub expand_query: bool,
}

fn default_top_k() -> usize {
    3
}
fn default_retrieval_tokens() -> usize {
    300
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_tokens: default_retrieval_tokens(),
            expand_query: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Number of most recent turns rendered into the prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Log every assembled prompt with a token estimate
    #[serde(default)]
    pub debug: bool,
}

fn default_history_window() -> usize {
    3
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit; attempt `n` waits `backoff_base_ms * 2^n`
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Returned to the user when every attempt failed
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

fn default_max_retries() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    1000
}
fn default_fallback_message() -> String {
    "Maaf, saya sedang mengalami masalah teknis. Silakan coba lagi nanti.".into()
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            fallback_message: default_fallback_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// "sqlite", "memory" or "none"
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    /// Entries older than this (by creation) are not served
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,

    /// `cache clean` removes entries unused for this long
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_true() -> bool {
    true
}
fn default_cache_backend() -> String {
    "sqlite".into()
}
fn default_cache_path() -> PathBuf {
    PathBuf::from("data/responder.sqlite")
}
fn default_ttl_hours() -> u32 {
    24
}
fn default_retention_days() -> u32 {
    7
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: default_cache_backend(),
            path: default_cache_path(),
            ttl_hours: default_ttl_hours(),
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Directory of `<identity>.json` profile overrides
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,

    /// Optional directory with `contexts/`, `personalities/`, `styles/`
    /// JSON templates that extend the built-in set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
}

fn default_profiles_dir() -> PathBuf {
    PathBuf::from("profil")
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            profiles_dir: default_profiles_dir(),
            templates_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,

    /// How many turns the store hands back per request
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("data/conversations")
}
fn default_max_messages() -> usize {
    10
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: default_history_dir(),
            max_messages: default_max_messages(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.jtrade-responder/config.toml).
    ///
    /// Also checks environment variables:
    /// - `RESPONDER_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `RESPONDER_PROVIDER`, `RESPONDER_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("RESPONDER_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("RESPONDER_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("RESPONDER_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".jtrade-responder")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.completion.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "completion.max_retries must be at least 1".into(),
            ));
        }

        if self.cache.ttl_hours == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_hours must be > 0".into(),
            ));
        }

        if !matches!(self.knowledge.embedder.as_str(), "token_hash" | "digest") {
            return Err(ConfigError::ValidationError(format!(
                "knowledge.embedder must be \"token_hash\" or \"digest\", got \"{}\"",
                self.knowledge.embedder
            )));
        }

        Ok(())
    }

    /// API key for an answering account.
    ///
    /// Looks up `OPENAI_API_<IDENTITY>` (upper-cased) first, then the
    /// configured key for the default provider, then the root key.
    pub fn api_key_for(&self, identity: &str) -> Option<String> {
        let var = format!("OPENAI_API_{}", identity.to_uppercase());
        std::env::var(var)
            .ok()
            .or_else(|| {
                self.providers
                    .get(&self.default_provider)
                    .and_then(|p| p.api_key.clone())
            })
            .or_else(|| self.api_key.clone())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            knowledge: KnowledgeConfig::default(),
            retrieval: RetrievalConfig::default(),
            prompt: PromptConfig::default(),
            completion: CompletionConfig::default(),
            cache: CacheConfig::default(),
            persona: PersonaConfig::default(),
            history: HistoryConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
