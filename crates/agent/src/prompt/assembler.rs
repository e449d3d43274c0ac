//! The prompt assembler. Stateless — create one and reuse it.

use super::templates::{BREVITY_INSTRUCTION, render_system};
use super::{PromptContext, SectionKind};
use responder_core::conversation::{ConversationTurn, TurnRole};
use responder_core::intent::IntentResult;
use responder_core::persona::Persona;
use responder_knowledge::{EmbeddingIndex, KnowledgeStore, format_snippets};
use serde_json::Value;
use tracing::{debug, warn};

/// Header of the product facts block.
pub const PRODUCTS_HEADER: &str = "Informasi produk yang relevan:";

/// Header of the history section.
pub const HISTORY_HEADER: &str = "Percakapan sebelumnya:";

/// FAQ questions containing any of these are fee/registration facts.
pub const FAQ_KEYWORDS: [&str; 4] = ["biaya", "fee", "daftar", "buka akun"];

const MAX_PRODUCT_FACTS: usize = 2;
const MAX_FAQ_FACTS: usize = 2;

#[derive(Debug, Clone)]
pub struct PromptAssembler {
    history_window: usize,
    top_k: usize,
    retrieval_max_tokens: usize,
    expand_query: bool,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self {
            history_window: 3,
            top_k: 3,
            retrieval_max_tokens: 300,
            expand_query: false,
        }
    }
}

impl PromptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &responder_config::AppConfig) -> Self {
        Self {
            history_window: config.prompt.history_window,
            top_k: config.retrieval.top_k,
            retrieval_max_tokens: config.retrieval.max_tokens,
            expand_query: config.retrieval.expand_query,
        }
    }

    /// How many of the most recent turns to include.
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Snippet count and token ceiling for the retrieved section.
    pub fn with_retrieval(mut self, top_k: usize, max_tokens: usize) -> Self {
        self.top_k = top_k;
        self.retrieval_max_tokens = max_tokens;
        self
    }

    /// Retrieve with the message expanded by intent labels and persona
    /// context instead of the raw message.
    pub fn with_query_expansion(mut self, enabled: bool) -> Self {
        self.expand_query = enabled;
        self
    }

    /// Build the prompt for `message`.
    ///
    /// Retrieval failures drop the retrieved section and are logged; the
    /// prompt is always produced.
    pub async fn assemble(
        &self,
        persona: &Persona,
        history: &[ConversationTurn],
        message: &str,
        intents: &IntentResult,
        index: &EmbeddingIndex,
    ) -> PromptContext {
        let mut ctx = PromptContext::new();

        ctx.push(SectionKind::System, render_system(persona));
        ctx.push(SectionKind::Instruction, BREVITY_INSTRUCTION);

        let store = index.store().await;
        ctx.push(SectionKind::IntentInfo, intent_facts(&store, intents));

        let retrieved = if self.expand_query {
            index
                .augment(persona, message, intents, self.top_k, self.retrieval_max_tokens)
                .await
        } else {
            index.retrieve(message, self.top_k).await.map(|hits| {
                debug!(hits = hits.len(), "Retrieved knowledge snippets");
                format_snippets(&hits, self.retrieval_max_tokens)
            })
        };
        match retrieved {
            Ok(section) => ctx.push(SectionKind::RetrievedKnowledge, section),
            Err(e) => warn!(error = %e, "Knowledge retrieval failed, continuing without it"),
        }

        ctx.push(SectionKind::History, format_history(history, self.history_window));
        ctx.push(
            SectionKind::LatestMessage,
            format!("User: {}\nAssistant:", message.trim()),
        );

        ctx
    }
}

/// Facts selected by intent: product descriptions for `inquiry_product`,
/// fee/registration FAQ entries for `inquiry_fee` or `inquiry_registration`.
pub fn intent_facts(store: &KnowledgeStore, intents: &IntentResult) -> String {
    let mut lines: Vec<String> = Vec::new();

    if intents.contains("inquiry_product") {
        let products: Vec<String> = store
            .category("products")
            .and_then(Value::as_object)
            .map(|products| {
                products
                    .iter()
                    .filter_map(|(name, data)| {
                        let description = data.get("description")?.as_str()?;
                        Some(format!("- {name}: {description}"))
                    })
                    .take(MAX_PRODUCT_FACTS)
                    .collect()
            })
            .unwrap_or_default();

        if !products.is_empty() {
            lines.push(PRODUCTS_HEADER.to_string());
            lines.extend(products);
        }
    }

    if intents.contains("inquiry_fee") || intents.contains("inquiry_registration") {
        let faqs = store
            .category("faq")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        lines.extend(
            faqs.iter()
                .filter_map(|faq| {
                    let question = faq.get("question")?.as_str()?;
                    let answer = faq.get("answer")?.as_str()?;
                    let lowered = question.to_lowercase();
                    FAQ_KEYWORDS
                        .iter()
                        .any(|kw| lowered.contains(kw))
                        .then(|| format!("- {question}: {answer}"))
                })
                .take(MAX_FAQ_FACTS),
        );
    }

    lines.join("\n")
}

/// The last `window` turns as `User:` / `Assistant:` lines under
/// [`HISTORY_HEADER`]; empty when there is no history.
pub fn format_history(history: &[ConversationTurn], window: usize) -> String {
    let recent = &history[history.len().saturating_sub(window)..];
    if recent.is_empty() {
        return String::new();
    }

    let mut lines = vec![HISTORY_HEADER.to_string()];
    lines.extend(recent.iter().map(|turn| match turn.role {
        TurnRole::Incoming => format!("User: {}", turn.content),
        TurnRole::Outgoing => format!("Assistant: {}", turn.content),
    }));
    lines.join("\n")
}
