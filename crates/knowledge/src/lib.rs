//! Knowledge store and embedding index for the JTRADE auto-responder.
//!
//! - [`store`] loads knowledge documents and flattens them to dotted paths
//! - [`factory`] writes knowledge documents from named sources
//! - [`embedder`] provides the deterministic hash embedders
//! - [`index`] embeds, persists and ranks flattened entries

pub mod embedder;
pub mod factory;
pub mod index;
pub mod similarity;
pub mod store;

pub use embedder::{DigestEmbedder, TokenHashEmbedder, embedder_by_name};
pub use factory::{KnowledgeBaseFactory, create_default_kb, default_factory};
pub use index::{EmbeddingIndex, RETRIEVED_HEADER, RetrievedSnippet, format_snippets};
pub use similarity::cosine_similarity;
pub use store::{KnowledgeBase, KnowledgeStore, flatten, resolve};
