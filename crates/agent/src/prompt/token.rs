//! Token estimation utilities.
//!
//! Character heuristic: ~4 characters per token. The word heuristic
//! (`words × 1.3`) is what the prompt debug output reports.

use responder_core::message::ChatMessage;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.len() + 3) / 4
}

/// Word-based estimate: whitespace-separated words × 1.3, truncated.
pub fn estimate_tokens_by_words(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 * 1.3) as usize
}

/// Estimate tokens for a single message including per-message overhead.
///
/// Each message costs ~4 tokens of overhead for role name and delimiters.
pub fn estimate_message_tokens(message: &ChatMessage) -> usize {
    let overhead = 4;
    overhead + estimate_tokens(&message.content)
}
