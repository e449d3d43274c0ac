//! Intent Classifier — rule-based multi-label tagging of a chat message.
//!
//! Each category scores one point per keyword found as a whole word in the
//! lower-cased message. A `?` anywhere adds `question`. Nothing matched means
//! `{"general": 1}`.

use responder_core::intent::{IntentResult, QUESTION_INTENT};

/// Category → keywords. Multi-word keywords match as a phrase.
pub const INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "greeting",
        &["halo", "hai", "pagi", "siang", "malam", "selamat", "salam", "yo", "hey"],
    ),
    (
        "inquiry_product",
        &[
            "produk", "investasi", "saham", "reksa dana", "obligasi", "reksadana", "trading",
            "cuan", "paket",
        ],
    ),
    (
        "inquiry_fee",
        &["biaya", "fee", "komisi", "charge", "harga", "bayar", "ongkos"],
    ),
    (
        "inquiry_registration",
        &["daftar", "register", "buka akun", "cara mulai", "buat akun", "join", "gabung"],
    ),
    (
        "inquiry_process",
        &["cara", "proses", "langkah", "gimana", "gmn", "gituan"],
    ),
    (
        "comparison",
        &["banding", "dibanding", "versus", "vs", "lebih baik", "mending", "bagusan"],
    ),
    (
        "complaint",
        &[
            "keluhan", "masalah", "error", "gagal", "nggak bisa", "gangguan", "trouble", "kenapa",
            "kok",
        ],
    ),
    (
        "gratitude",
        &["makasih", "thanks", "tq", "thx", "thank you", "mantap"],
    ),
    (
        "farewell",
        &["bye", "dadah", "sampai jumpa", "selamat tinggal", "ciao", "see ya"],
    ),
];

/// Stateless keyword classifier. Cheap to copy and safe to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Tag `message` with every category it mentions.
    pub fn detect(&self, message: &str) -> IntentResult {
        let lowered = message.to_lowercase();

        let mut scores: Vec<(String, u32)> = INTENT_KEYWORDS
            .iter()
            .map(|(category, keywords)| {
                let hits = keywords
                    .iter()
                    .filter(|kw| contains_word(&lowered, kw))
                    .count() as u32;
                (category.to_string(), hits)
            })
            .collect();

        if lowered.contains('?') {
            scores.push((QUESTION_INTENT.to_string(), 1));
        }

        IntentResult::from_scores(scores)
    }
}

/// True when `needle` occurs in `haystack` with no word character directly
/// before or after it.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
