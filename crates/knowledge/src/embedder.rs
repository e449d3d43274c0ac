//! Deterministic hash embedders.
//!
//! Neither embedder captures meaning. [`TokenHashEmbedder`] at least gives
//! texts that share words overlapping vectors, which is enough for FAQ-style
//! lookups over a small knowledge base.

use async_trait::async_trait;
use responder_core::embedding::{EMBEDDING_DIM, Embedder, EmbeddingVector, fit_to_dim};
use responder_core::error::KnowledgeError;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Feature-hashing embedder: every lower-cased alphanumeric token adds one
/// to the bucket its SHA-256 digest selects.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenHashEmbedder;

impl TokenHashEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn bucket(token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(head) % EMBEDDING_DIM as u64) as usize
    }
}

/// Lower-case `text` and split it on anything that is not alphanumeric.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl Embedder for TokenHashEmbedder {
    fn name(&self) -> &str {
        "token_hash"
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, KnowledgeError> {
        let mut vector = vec![0.0f32; EMBEDDING_DIM];
        for token in tokenize(text) {
            vector[Self::bucket(&token)] += 1.0;
        }
        Ok(vector)
    }
}

/// Whole-text digest fingerprint: each SHA-256 byte modulo 10, zero padded
/// to 128 components. Identical texts match; anything else is noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestEmbedder;

impl DigestEmbedder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Embedder for DigestEmbedder {
    fn name(&self) -> &str {
        "digest"
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, KnowledgeError> {
        let digest = Sha256::digest(text.as_bytes());
        let head: EmbeddingVector = digest.iter().map(|b| f32::from(b % 10)).collect();
        Ok(fit_to_dim(head))
    }
}

/// Build an embedder by its configured name.
pub fn embedder_by_name(name: &str) -> Option<Arc<dyn Embedder>> {
    match name {
        "token_hash" => Some(Arc::new(TokenHashEmbedder::new())),
        "digest" => Some(Arc::new(DigestEmbedder::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn vectors_have_fixed_length() {
        let long = "saham ".repeat(500);
        for embedder in [embedder_by_name("token_hash").unwrap(), embedder_by_name("digest").unwrap()] {
            assert_eq!(embedder.embed("").await.unwrap().len(), EMBEDDING_DIM);
            assert_eq!(embedder.embed(&long).await.unwrap().len(), EMBEDDING_DIM);
        }
    }

    #[tokio::test]
    async fn embedding_is_deterministic() {
        let e = TokenHashEmbedder::new();
        let a = e.embed("Berapa minimum deposit di JTRADE?").await.unwrap();
        let b = e.embed("Berapa minimum deposit di JTRADE?").await.unwrap();
        assert_eq!(a, b);

        let d = DigestEmbedder::new();
        assert_eq!(d.embed("halo").await.unwrap(), d.embed("halo").await.unwrap());
    }

    #[tokio::test]
    async fn token_hash_is_case_and_punctuation_insensitive() {
        let e = TokenHashEmbedder::new();
        let a = e.embed("Minimum Deposit?").await.unwrap();
        let b = e.embed("minimum, deposit").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.iter().sum::<f32>(), 2.0);
    }

    #[tokio::test]
    async fn shared_words_score_higher_than_unrelated_text() {
        let e = TokenHashEmbedder::new();
        let query = e.embed("berapa minimum deposit").await.unwrap();
        let related = e.embed("Berapa minimum deposit di JTRADE?").await.unwrap();
        let unrelated = e.embed("").await.unwrap();
        assert!(cosine_similarity(&query, &related) > 0.5);
        assert_eq!(cosine_similarity(&query, &unrelated), 0.0);
    }

    #[tokio::test]
    async fn digest_values_are_single_digits_then_zero() {
        let v = DigestEmbedder::new().embed("obligasi").await.unwrap();
        assert!(v[..32].iter().all(|x| (0.0..10.0).contains(x)));
        assert!(v[32..].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn unknown_embedder_name() {
        assert!(embedder_by_name("bert").is_none());
    }

    #[test]
    fn tokenize_lowercases_and_splits() {
        let tokens: Vec<_> = tokenize("Halo, berapa minimum deposit?").collect();
        assert_eq!(tokens, vec!["halo", "berapa", "minimum", "deposit"]);
    }
}
