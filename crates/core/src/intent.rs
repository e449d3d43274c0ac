//! Intent classification result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label used when no rule matched.
pub const GENERAL_INTENT: &str = "general";

/// Label added for any message containing a question mark.
pub const QUESTION_INTENT: &str = "question";

/// Mapping from intent label to a positive score.
///
/// Never empty: a classifier that finds nothing yields `{"general": 1}`.
/// Backed by a `BTreeMap` so iteration (and therefore anything rendered from
/// it) is ordered by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentResult(BTreeMap<String, u32>);

impl IntentResult {
    /// Build from raw scores, dropping zero scores and falling back to
    /// `general` when nothing remains.
    pub fn from_scores(scores: impl IntoIterator<Item = (String, u32)>) -> Self {
        let mut map: BTreeMap<String, u32> = scores.into_iter().filter(|(_, s)| *s > 0).collect();
        if map.is_empty() {
            map.insert(GENERAL_INTENT.to_string(), 1);
        }
        Self(map)
    }

    /// The fallback result.
    pub fn general() -> Self {
        Self::from_scores(std::iter::empty())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    pub fn score(&self, label: &str) -> Option<u32> {
        self.0.get(label).copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The label with the highest score (ties → alphabetically first).
    pub fn primary(&self) -> &str {
        self.0
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(k, _)| k.as_str())
            .unwrap_or(GENERAL_INTENT)
    }
}

impl std::fmt::Display for IntentResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(", "))
    }
}
