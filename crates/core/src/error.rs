//! Error types for the responder domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Knowledge document {0} is not a JSON object")]
    NotADocument(String),

    #[error("Failed to persist embeddings to {path}: {reason}")]
    Persist { path: PathBuf, reason: String },

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Override source missing: {0}")]
    SourceMissing(String),

    #[error("Failed to load override {name}: {reason}")]
    Load { name: String, reason: String },
}
