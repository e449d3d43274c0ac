//! The response engine — wires the pipeline for one incoming message.
//!
//! Built once at the application root and shared by every chat task; all
//! per-request state lives on the stack of [`ResponseEngine::respond`].

use crate::completion::CompletionClient;
use crate::intent::IntentClassifier;
use crate::persona::{PersonaRegistry, PersonaResolver};
use crate::prompt::{PromptAssembler, PromptContext, token};
use responder_core::conversation::{ConversationKey, ConversationStore, ConversationTurn};
use responder_core::intent::IntentResult;
use responder_core::persona::Persona;
use responder_core::provider::Provider;
use responder_core::cache::ResponseCache;
use responder_knowledge::{EmbeddingIndex, TokenHashEmbedder, embedder_by_name};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything the engine derived for a message before completion.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub intents: IntentResult,
    pub persona: Persona,
    pub context: PromptContext,
}

impl PreparedPrompt {
    pub fn prompt(&self) -> String {
        self.context.render()
    }
}

/// The reply handed back to the transport layer.
#[derive(Debug, Clone)]
pub struct EngineReply {
    pub request_id: Uuid,
    pub text: String,
    pub intents: IntentResult,
}

pub struct ResponseEngine {
    classifier: IntentClassifier,
    personas: PersonaResolver,
    assembler: PromptAssembler,
    index: Arc<EmbeddingIndex>,
    history: Arc<dyn ConversationStore>,
    completion: CompletionClient,
    history_limit: usize,
    debug_prompts: bool,
}

impl ResponseEngine {
    pub fn new(
        index: Arc<EmbeddingIndex>,
        history: Arc<dyn ConversationStore>,
        personas: PersonaResolver,
        completion: CompletionClient,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            personas,
            assembler: PromptAssembler::new(),
            index,
            history,
            completion,
            history_limit: 10,
            debug_prompts: false,
        }
    }

    /// Build every collaborator from configuration. The provider, cache and
    /// history store are injected so callers choose their backends.
    pub fn from_config(
        config: &responder_config::AppConfig,
        provider: Arc<dyn Provider>,
        cache: Arc<dyn ResponseCache>,
        history: Arc<dyn ConversationStore>,
    ) -> Self {
        let index = Arc::new(index_from_config(config));
        let personas = PersonaResolver::new(Arc::new(PersonaRegistry::from_config(&config.persona)));
        let completion = CompletionClient::from_config(provider, cache, config);

        Self::new(index, history, personas, completion)
            .with_assembler(PromptAssembler::from_config(config))
            .with_history_limit(config.history.max_messages)
            .with_debug_prompts(config.prompt.debug)
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Turns read from the conversation store per request.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Log each full prompt and its word-based token estimate at debug level.
    pub fn with_debug_prompts(mut self, enabled: bool) -> Self {
        self.debug_prompts = enabled;
        self
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    pub fn completion(&self) -> &CompletionClient {
        &self.completion
    }

    pub fn personas(&self) -> &PersonaResolver {
        &self.personas
    }

    /// Classify, resolve and assemble without calling the provider.
    pub async fn prepare(&self, key: &ConversationKey, message: &str) -> PreparedPrompt {
        let intents = self.classifier.detect(message);
        let persona = self.personas.resolve(&key.identity);

        let history = match self.history.history(key, self.history_limit).await {
            Ok(turns) => turns,
            Err(e) => {
                warn!(conversation = %key, error = %e, "History unavailable, answering without it");
                Vec::new()
            }
        };

        let context = self
            .assembler
            .assemble(&persona, &history, message, &intents, &self.index)
            .await;

        PreparedPrompt {
            intents,
            persona,
            context,
        }
    }

    /// Produce the reply for `message` and record both turns.
    pub async fn respond(&self, key: &ConversationKey, message: &str) -> EngineReply {
        let request_id = Uuid::new_v4();
        info!(%request_id, conversation = %key, "Incoming message");

        let prepared = self.prepare(key, message).await;
        info!(%request_id, intents = %prepared.intents, persona = %prepared.persona.name, "Message classified");

        let prompt = prepared.prompt();
        if self.debug_prompts {
            debug!(
                %request_id,
                prompt = %prompt,
                token_estimate = token::estimate_tokens_by_words(&prompt),
                "Prompt debug"
            );
        }

        let text = self.completion.complete(&prompt).await;

        for turn in [
            ConversationTurn::incoming(message),
            ConversationTurn::outgoing(text.as_str()),
        ] {
            if let Err(e) = self.history.append(key, turn).await {
                warn!(%request_id, conversation = %key, error = %e, "Failed to record turn");
            }
        }

        info!(%request_id, chars = text.chars().count(), "Reply ready");
        EngineReply {
            request_id,
            text,
            intents: prepared.intents,
        }
    }
}

/// The embedding index described by `[knowledge]`. An unknown embedder
/// name falls back to the token-hash embedder.
pub fn index_from_config(config: &responder_config::AppConfig) -> EmbeddingIndex {
    let knowledge = &config.knowledge;
    let embedder = embedder_by_name(&knowledge.embedder).unwrap_or_else(|| {
        warn!(embedder = %knowledge.embedder, "Unknown embedder, using token_hash");
        Arc::new(TokenHashEmbedder::new())
    });

    EmbeddingIndex::new(&knowledge.dir, embedder)
        .with_cache(&knowledge.embedding_cache)
        .with_min_text_len(knowledge.min_text_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use responder_core::conversation::TurnRole;
    use responder_knowledge::create_default_kb;
    use responder_memory::{InMemoryCache, InMemoryHistory};

    struct Fixture {
        _dir: tempfile::TempDir,
        provider: Arc<ScriptedProvider>,
        history: Arc<InMemoryHistory>,
        engine: ResponseEngine,
    }

    fn fixture(provider: ScriptedProvider) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        create_default_kb(dir.path()).unwrap();
        let index = Arc::new(EmbeddingIndex::new(dir.path(), Arc::new(TokenHashEmbedder::new())));
        let provider = Arc::new(provider);
        let history = Arc::new(InMemoryHistory::new());
        let completion =
            CompletionClient::new(provider.clone(), Arc::new(InMemoryCache::new()), "test-model");
        let personas = PersonaResolver::new(Arc::new(PersonaRegistry::builtin()));

        let engine = ResponseEngine::new(index, history.clone(), personas, completion);
        Fixture {
            _dir: dir,
            provider,
            history,
            engine,
        }
    }

    #[tokio::test]
    async fn respond_records_both_turns() {
        let f = fixture(ScriptedProvider::answering("Minimal Rp 1.000.000 ya."));
        let key = ConversationKey::new("cs", "1", "2");

        let reply = f.engine.respond(&key, "Halo, berapa minimum deposit?").await;
        assert_eq!(reply.text, "Minimal Rp 1.000.000 ya.");
        assert!(reply.intents.contains("greeting"));

        let turns = f.history.history(&key, 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::Incoming);
        assert_eq!(turns[1].content, "Minimal Rp 1.000.000 ya.");
    }

    #[tokio::test]
    async fn previous_turns_reach_the_prompt() {
        let f = fixture(ScriptedProvider::answering("Siap."));
        let key = ConversationKey::new("cs", "1", "2");
        f.engine.respond(&key, "Halo").await;

        let prepared = f.engine.prepare(&key, "Lanjut").await;
        let prompt = prepared.prompt();
        assert!(prompt.contains("Percakapan sebelumnya:\nUser: Halo\nAssistant: Siap."));
        assert!(prompt.ends_with("User: Lanjut\nAssistant:"));
    }

    #[tokio::test]
    async fn provider_sees_assembled_prompt() {
        let f = fixture(ScriptedProvider::answering("ok"));
        let key = ConversationKey::new("cs", "9", "9");
        let expected = f.engine.prepare(&key, "Apa itu reksa dana?").await.prompt();

        f.engine.respond(&key, "Apa itu reksa dana?").await;
        let request = f.provider.last_request().unwrap();
        assert_eq!(request.messages[1].content, expected);
    }

    #[tokio::test]
    async fn failing_provider_still_replies() {
        tokio::time::pause();
        let f = fixture(ScriptedProvider::failing());
        let key = ConversationKey::new("cs", "1", "2");

        let reply = f.engine.respond(&key, "Halo").await;
        assert_eq!(reply.text, f.engine.completion().fallback());
        assert_eq!(f.history.history(&key, 10).await.unwrap().len(), 2);
    }

    #[test]
    fn index_from_config_accepts_unknown_embedder() {
        let mut config = responder_config::AppConfig::default();
        config.knowledge.embedder = "word2vec".into();
        let index = index_from_config(&config);
        assert_eq!(index.embedder().name(), "token_hash");
    }
}
