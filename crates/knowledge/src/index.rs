//! Embedding Index — vectors for every flattened knowledge entry.
//!
//! The index owns the loaded [`KnowledgeStore`] together with its vectors as
//! one immutable snapshot. [`EmbeddingIndex::build`] reloads the directory,
//! embeds into a fresh snapshot and swaps it in under a write lock, so
//! concurrent [`retrieve`](EmbeddingIndex::retrieve) calls see either the old
//! or the new index. Rebuilds are serialized by a separate mutex.

use crate::similarity::cosine_similarity;
use crate::store::KnowledgeStore;
use responder_core::embedding::{EMBEDDING_DIM, Embedder, EmbeddingVector, fit_to_dim};
use responder_core::error::KnowledgeError;
use responder_core::intent::IntentResult;
use responder_core::persona::Persona;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Header of the retrieved-knowledge prompt section.
pub const RETRIEVED_HEADER: &str = "Informasi relevan dari knowledge base:";

/// Texts this short (in characters) are not worth a fingerprint.
pub const DEFAULT_MIN_TEXT_LEN: usize = 10;

/// Category holding bookkeeping written by the factory; never indexed.
const METADATA_CATEGORY: &str = "metadata";

/// One ranked retrieval hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSnippet {
    pub key: String,
    pub text: String,
    pub score: f32,
}

/// On-disk form of the embedding cache.
#[derive(Debug, Serialize, Deserialize)]
struct VectorCache<V> {
    embedder: String,
    dim: usize,
    vectors: V,
}

#[derive(Debug, Default)]
struct IndexSnapshot {
    store: Arc<KnowledgeStore>,
    vectors: BTreeMap<String, EmbeddingVector>,
    /// Set once a `build()` produced this snapshot.
    built: bool,
}

pub struct EmbeddingIndex {
    knowledge_dir: PathBuf,
    cache_path: Option<PathBuf>,
    min_text_len: usize,
    embedder: Arc<dyn Embedder>,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    build_lock: Mutex<()>,
}

impl EmbeddingIndex {
    /// Load the knowledge directory. No vectors exist until [`build`](Self::build)
    /// runs or a persisted cache is attached with [`with_cache`](Self::with_cache).
    pub fn new(knowledge_dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        let knowledge_dir = knowledge_dir.into();
        let store = KnowledgeStore::load(&knowledge_dir);
        Self {
            knowledge_dir,
            cache_path: None,
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            embedder,
            snapshot: RwLock::new(Arc::new(IndexSnapshot {
                store: Arc::new(store),
                ..IndexSnapshot::default()
            })),
            build_lock: Mutex::new(()),
        }
    }

    /// Persist vectors to `path` after every build, and load any vectors
    /// already stored there by the same embedder.
    pub fn with_cache(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let vectors = load_vectors(&path, self.embedder.name());
        let snapshot = self.snapshot.get_mut();
        *snapshot = Arc::new(IndexSnapshot {
            store: snapshot.store.clone(),
            vectors,
            built: false,
        });
        self.cache_path = Some(path);
        self
    }

    pub fn with_min_text_len(mut self, min_text_len: usize) -> Self {
        self.min_text_len = min_text_len;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Number of indexed vectors.
    pub async fn len(&self) -> usize {
        self.snapshot.read().await.vectors.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The knowledge the current index was built from.
    pub async fn store(&self) -> Arc<KnowledgeStore> {
        self.snapshot.read().await.store.clone()
    }

    async fn current(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Reload every knowledge base, embed each entry whose text is longer
    /// than the minimum, persist the vectors and publish the new index.
    ///
    /// Entries that fail to embed are logged and skipped. The new index is
    /// published even when persisting fails; the error is returned.
    pub async fn build(&self) -> Result<usize, KnowledgeError> {
        let _guard = self.build_lock.lock().await;
        self.rebuild().await
    }

    /// Build unless another caller already did while we waited for the lock.
    async fn build_if_needed(&self) {
        let _guard = self.build_lock.lock().await;
        let snapshot = self.current().await;
        if !snapshot.vectors.is_empty() || snapshot.built {
            return;
        }
        debug!("Index empty, building before retrieval");
        if let Err(e) = self.rebuild().await {
            warn!(error = %e, "Lazy index build reported an error");
        }
    }

    /// Callers hold `build_lock`.
    async fn rebuild(&self) -> Result<usize, KnowledgeError> {
        let store = KnowledgeStore::load(&self.knowledge_dir);
        let mut vectors = BTreeMap::new();

        for base in store.bases() {
            let metadata_prefix = format!("{}.{METADATA_CATEGORY}.", base.name());
            for (key, text) in base.entries() {
                if key.starts_with(&metadata_prefix) || text.chars().count() <= self.min_text_len {
                    continue;
                }
                match self.embedder.embed(text).await {
                    Ok(v) => {
                        vectors.insert(key.clone(), fit_to_dim(v));
                    }
                    Err(e) => warn!(key = %key, error = %e, "Skipping entry that failed to embed"),
                }
            }
        }

        let count = vectors.len();
        let persisted = match &self.cache_path {
            Some(path) => persist_vectors(path, self.embedder.name(), &vectors),
            None => Ok(()),
        };

        *self.snapshot.write().await = Arc::new(IndexSnapshot {
            store: Arc::new(store),
            vectors,
            built: true,
        });

        info!(
            entries = count,
            embedder = self.embedder.name(),
            "Knowledge index built"
        );
        persisted.map(|_| count)
    }

    /// Rank indexed entries against `query`.
    ///
    /// Results are sorted by descending score, ties by ascending key, and
    /// hold at most `top_k` entries. Keys whose text can no longer be
    /// resolved (a stale persisted cache) are dropped before truncation. An
    /// index that was never built is built once first.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedSnippet>, KnowledgeError> {
        let mut snapshot = self.current().await;
        if snapshot.vectors.is_empty() && !snapshot.built {
            self.build_if_needed().await;
            snapshot = self.current().await;
        }

        if snapshot.vectors.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = fit_to_dim(self.embedder.embed(query).await?);

        let mut scored: Vec<RetrievedSnippet> = snapshot
            .vectors
            .iter()
            .filter_map(|(key, vector)| {
                let text = snapshot.store.resolve(key)?;
                Some(RetrievedSnippet {
                    key: key.clone(),
                    text,
                    score: cosine_similarity(&query_vector, vector),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Retrieve with the query expanded by the intent labels and the
    /// persona's context, formatted as a prompt section.
    pub async fn augment(
        &self,
        persona: &Persona,
        query: &str,
        intents: &IntentResult,
        top_k: usize,
        max_tokens: usize,
    ) -> Result<String, KnowledgeError> {
        let hits = self.retrieve(&expanded_query(persona, query, intents), top_k).await?;
        Ok(format_snippets(&hits, max_tokens))
    }
}

/// `query` followed by the intent labels and the persona's context.
pub fn expanded_query(persona: &Persona, query: &str, intents: &IntentResult) -> String {
    let labels: Vec<&str> = intents.labels().collect();
    format!("{query} {} {}", labels.join(" "), persona.context)
}

/// Render hits as `- text` lines under [`RETRIEVED_HEADER`].
///
/// Lines are added while the running character count stays within
/// `max_tokens * 4`; the first line that would exceed it ends the list.
/// Returns an empty string when nothing fits.
pub fn format_snippets(hits: &[RetrievedSnippet], max_tokens: usize) -> String {
    let budget = max_tokens.saturating_mul(4);
    let mut lines = vec![RETRIEVED_HEADER.to_string()];
    let mut used = 0usize;

    for hit in hits {
        let line = format!("- {}", hit.text);
        let len = line.chars().count();
        if used + len > budget {
            break;
        }
        used += len;
        lines.push(line);
    }

    if lines.len() == 1 {
        return String::new();
    }
    lines.join("\n")
}

/// Vectors stored at `path` by `embedder`. A cache written by another
/// embedder or for another dimension is ignored.
fn load_vectors(path: &Path, embedder: &str) -> BTreeMap<String, EmbeddingVector> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return BTreeMap::new(), // No cache yet
    };

    let cache: VectorCache<BTreeMap<String, EmbeddingVector>> = match serde_json::from_str(&content) {
        Ok(cache) => cache,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable embedding cache");
            return BTreeMap::new();
        }
    };

    if cache.embedder != embedder || cache.dim != EMBEDDING_DIM {
        info!(
            path = %path.display(),
            cached_embedder = %cache.embedder,
            cached_dim = cache.dim,
            embedder,
            "Embedding cache was built differently, ignoring it"
        );
        return BTreeMap::new();
    }

    let vectors: BTreeMap<_, _> = cache
        .vectors
        .into_iter()
        .filter(|(_, v)| v.len() == EMBEDDING_DIM)
        .collect();
    info!(path = %path.display(), count = vectors.len(), "Loaded embeddings from cache");
    vectors
}

fn persist_vectors(
    path: &Path,
    embedder: &str,
    vectors: &BTreeMap<String, EmbeddingVector>,
) -> Result<(), KnowledgeError> {
    let persist_err = |reason: String| KnowledgeError::Persist {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| persist_err(e.to_string()))?;
    }
    let cache = VectorCache {
        embedder: embedder.to_string(),
        dim: EMBEDDING_DIM,
        vectors,
    };
    let content = serde_json::to_string(&cache).map_err(|e| persist_err(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| persist_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::TokenHashEmbedder;
    use crate::factory::{KnowledgeBaseFactory, create_default_kb};
    use crate::embedder::DigestEmbedder;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token_index(dir: &Path) -> EmbeddingIndex {
        EmbeddingIndex::new(dir, Arc::new(TokenHashEmbedder::new()))
    }

    /// Every text maps to the same vector, so all scores tie.
    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        fn name(&self) -> &str {
            "constant"
        }
        async fn embed(&self, _text: &str) -> Result<EmbeddingVector, KnowledgeError> {
            Ok(vec![1.0; 4])
        }
    }

    /// Fails on any text mentioning "rusak".
    struct PickyEmbedder;

    #[async_trait]
    impl Embedder for PickyEmbedder {
        fn name(&self) -> &str {
            "picky"
        }
        async fn embed(&self, text: &str) -> Result<EmbeddingVector, KnowledgeError> {
            if text.contains("rusak") {
                return Err(KnowledgeError::EmbeddingFailed("rusak".into()));
            }
            TokenHashEmbedder::new().embed(text).await
        }
    }

    /// Token-hash embedder that counts its calls.
    #[derive(Default)]
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }
        async fn embed(&self, text: &str) -> Result<EmbeddingVector, KnowledgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Yield so concurrent retrievals interleave with the build.
            tokio::task::yield_now().await;
            TokenHashEmbedder::new().embed(text).await
        }
    }

    fn write_cache(path: &Path, embedder: &str, dim: usize, vectors: &BTreeMap<String, Vec<f32>>) {
        let cache = VectorCache {
            embedder: embedder.to_string(),
            dim,
            vectors,
        };
        std::fs::write(path, serde_json::to_string(&cache).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn empty_directory_builds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = token_index(dir.path());
        assert_eq!(index.build().await.unwrap(), 0);
        assert!(index.retrieve("berapa biaya?", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_and_metadata_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        KnowledgeBaseFactory::new()
            .with_source("faq", json!({"pendek": "Rp 10.000", "panjang": "Biaya transaksi saham 0.1%"}))
            .build_kb(dir.path(), "general", None)
            .unwrap();

        let index = token_index(dir.path());
        assert_eq!(index.build().await.unwrap(), 1);
        let hits = index.retrieve("biaya transaksi", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "general.faq.panjang");
    }

    #[tokio::test]
    async fn retrieve_builds_lazily() {
        let dir = tempfile::tempdir().unwrap();
        create_default_kb(dir.path()).unwrap();
        let index = token_index(dir.path());
        assert!(index.is_empty().await);

        let hits = index.retrieve("berapa minimum deposit", 3).await.unwrap();
        assert!(!hits.is_empty());
        assert!(!index.is_empty().await);
    }

    #[tokio::test]
    async fn retrieve_ranks_faq_for_deposit_question() {
        let dir = tempfile::tempdir().unwrap();
        create_default_kb(dir.path()).unwrap();
        let index = token_index(dir.path());
        index.build().await.unwrap();

        let hits = index.retrieve("Halo, berapa minimum deposit?", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].key, "general.faq[0].question");
        assert!(hits.iter().any(|h| h.key == "general.faq[0].answer"));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn ties_break_by_ascending_key() {
        let dir = tempfile::tempdir().unwrap();
        KnowledgeBaseFactory::new()
            .with_source("faq", json!({
                "c": "teks cukup panjang C",
                "a": "teks cukup panjang A",
                "b": "teks cukup panjang B"
            }))
            .build_kb(dir.path(), "general", None)
            .unwrap();

        let index = EmbeddingIndex::new(dir.path(), Arc::new(ConstantEmbedder));
        index.build().await.unwrap();
        let keys: Vec<String> = index
            .retrieve("apa saja", 2)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.key)
            .collect();
        assert_eq!(keys, vec!["general.faq.a", "general.faq.b"]);
    }

    #[tokio::test]
    async fn failing_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        KnowledgeBaseFactory::new()
            .with_source("faq", json!({"ok": "akun berhasil dibuat", "bad": "data ini rusak total"}))
            .build_kb(dir.path(), "general", None)
            .unwrap();

        let index = EmbeddingIndex::new(dir.path(), Arc::new(PickyEmbedder));
        assert_eq!(index.build().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn vectors_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let kb_dir = dir.path().join("kb");
        let cache = dir.path().join("embeddings").join("cache.json");
        create_default_kb(&kb_dir).unwrap();

        let index = token_index(&kb_dir).with_cache(&cache);
        let built = index.build().await.unwrap();
        assert!(cache.exists());

        let persisted: VectorCache<BTreeMap<String, Vec<f32>>> =
            serde_json::from_str(&std::fs::read_to_string(&cache).unwrap()).unwrap();
        assert_eq!(persisted.embedder, "token_hash");
        assert_eq!(persisted.dim, EMBEDDING_DIM);
        assert_eq!(persisted.vectors.len(), built);
        assert!(persisted.vectors.values().all(|v| v.len() == EMBEDDING_DIM));

        let reopened = token_index(&kb_dir).with_cache(&cache);
        assert_eq!(reopened.len().await, built);
    }

    #[tokio::test]
    async fn stale_cached_keys_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache.json");
        let mut stale = BTreeMap::new();
        stale.insert("gone.faq.x".to_string(), vec![1.0f32; EMBEDDING_DIM]);
        write_cache(&cache, "token_hash", EMBEDDING_DIM, &stale);

        let index = token_index(&dir.path().join("kb")).with_cache(&cache);
        assert_eq!(index.len().await, 1);
        assert!(index.retrieve("apa saja", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_from_another_embedder_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let kb_dir = dir.path().join("kb");
        let cache = dir.path().join("cache.json");
        create_default_kb(&kb_dir).unwrap();

        let built = token_index(&kb_dir).with_cache(&cache).build().await.unwrap();
        assert!(built > 0);

        let reopened = EmbeddingIndex::new(&kb_dir, Arc::new(DigestEmbedder::new())).with_cache(&cache);
        assert!(reopened.is_empty().await);

        let question = "Berapa minimum deposit di JTRADE?";
        let hits = reopened.retrieve(question, 3).await.unwrap();
        assert_eq!(hits[0].text, question);
        assert_eq!(hits[0].key, "general.faq[0].question");

        let persisted: VectorCache<BTreeMap<String, Vec<f32>>> =
            serde_json::from_str(&std::fs::read_to_string(&cache).unwrap()).unwrap();
        assert_eq!(persisted.embedder, "digest");
    }

    #[tokio::test]
    async fn cache_with_other_dimension_or_legacy_layout_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache.json");
        let mut vectors = BTreeMap::new();
        vectors.insert("general.faq.x".to_string(), vec![1.0f32; 64]);

        write_cache(&cache, "token_hash", 64, &vectors);
        assert!(token_index(dir.path()).with_cache(&cache).is_empty().await);

        std::fs::write(&cache, serde_json::to_string(&vectors).unwrap()).unwrap();
        assert!(token_index(dir.path()).with_cache(&cache).is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_lazy_retrievals_build_once() {
        let dir = tempfile::tempdir().unwrap();
        create_default_kb(dir.path()).unwrap();
        let embedder = Arc::new(CountingEmbedder::default());
        let index = Arc::new(EmbeddingIndex::new(dir.path(), embedder.clone()));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let index = index.clone();
                tokio::spawn(async move { index.retrieve("biaya transaksi", 3).await })
            })
            .collect();
        for task in tasks {
            assert!(!task.await.unwrap().unwrap().is_empty());
        }

        let entries = index.len().await;
        assert!(entries > 0);
        // One build over every entry plus one query embedding per call.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), entries + 4);
    }

    #[tokio::test]
    async fn concurrent_retrieve_during_rebuild_sees_complete_index() {
        let dir = tempfile::tempdir().unwrap();
        create_default_kb(dir.path()).unwrap();
        let index = Arc::new(token_index(dir.path()));
        let full = index.build().await.unwrap();

        let rebuild = {
            let index = index.clone();
            tokio::spawn(async move { index.build().await })
        };
        for _ in 0..10 {
            assert_eq!(index.len().await, full);
            index.retrieve("biaya", 3).await.unwrap();
        }
        assert_eq!(rebuild.await.unwrap().unwrap(), full);
    }

    #[tokio::test]
    async fn augment_formats_section() {
        let dir = tempfile::tempdir().unwrap();
        create_default_kb(dir.path()).unwrap();
        let index = token_index(dir.path());
        let intents = IntentResult::from_scores([("inquiry_fee".to_string(), 1)]);

        let section = index
            .augment(&Persona::default(), "biaya transaksi saham", &intents, 3, 300)
            .await
            .unwrap();
        assert!(section.starts_with(RETRIEVED_HEADER));
        assert!(section.lines().skip(1).all(|l| l.starts_with("- ")));
    }

    #[test]
    fn format_snippets_stops_at_budget() {
        let hit = |text: &str| RetrievedSnippet {
            key: "k".into(),
            text: text.into(),
            score: 1.0,
        };
        // "- " + 10 chars = 12 chars per line; budget 6 tokens = 24 chars.
        let hits = vec![hit("aaaaaaaaaa"), hit("bbbbbbbbbb"), hit("cccccccccc")];
        let section = format_snippets(&hits, 6);
        assert_eq!(section, format!("{RETRIEVED_HEADER}\n- aaaaaaaaaa\n- bbbbbbbbbb"));

        assert_eq!(format_snippets(&hits, 2), "");
        assert_eq!(format_snippets(&[], 300), "");
    }
}
