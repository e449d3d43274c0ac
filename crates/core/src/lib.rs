//! # Responder Core
//!
//! Domain types, traits, and error definitions for the JTRADE auto-responder.
//! This crate has **no framework dependencies** — it defines the domain model
//! that the knowledge, memory, provider and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the reply pipeline is a trait here:
//! - [`Provider`] — the text-completion backend
//! - [`Embedder`] — the text → vector fingerprint function
//! - [`ResponseCache`] — prompt-hash keyed reply cache
//! - [`ConversationStore`] — the external conversation history
//!
//! Implementations live in their respective crates and are injected at the
//! application root, so tests can swap any of them for a stub.

pub mod error;
pub mod message;
pub mod provider;
pub mod conversation;
pub mod intent;
pub mod persona;
pub mod embedding;
pub mod cache;

// Re-export key types at crate root for ergonomics
pub use error::{KnowledgeError, MemoryError, PersonaError, ProviderError};
pub use message::{ChatMessage, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use conversation::{ConversationKey, ConversationStore, ConversationTurn, TurnRole};
pub use intent::IntentResult;
pub use persona::Persona;
pub use embedding::{Embedder, EmbeddingVector, EMBEDDING_DIM};
pub use cache::{CacheEntry, CacheStats, ResponseCache};
