//! Embedder trait — text → fixed-length numeric fingerprint.
//!
//! The index only ever talks to this trait, so the deterministic hash
//! embedders shipped in `responder-knowledge` can be replaced by a real
//! embedding API without touching indexing or ranking.

use async_trait::async_trait;
use crate::error::KnowledgeError;

/// Every vector stored in or compared by the index has exactly this many
/// components.
pub const EMBEDDING_DIM: usize = 128;

/// An embedding, keyed elsewhere by dotted path.
pub type EmbeddingVector = Vec<f32>;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier persisted next to the vectors (e.g. "token_hash").
    fn name(&self) -> &str;

    /// Embed a single text. Implementations may return any length; callers
    /// normalise with [`fit_to_dim`].
    async fn embed(&self, text: &str) -> std::result::Result<EmbeddingVector, KnowledgeError>;
}

/// Pad with zeros or truncate so the vector has exactly [`EMBEDDING_DIM`]
/// components.
pub fn fit_to_dim(mut vector: EmbeddingVector) -> EmbeddingVector {
    vector.resize(EMBEDDING_DIM, 0.0);
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_vectors_are_zero_padded() {
        let v = fit_to_dim(vec![1.0, 2.0]);
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert_eq!(v[1], 2.0);
        assert!(v[2..].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn long_vectors_are_truncated() {
        let v = fit_to_dim(vec![1.0; 500]);
        assert_eq!(v.len(), EMBEDDING_DIM);
    }
}
