//! Conversation history — the external store the engine reads from.
//!
//! The transport layer appends every incoming and outgoing message; the
//! reply pipeline only ever reads a bounded, most-recent window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;

/// Direction of a turn relative to the answering account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Sent by the chat partner
    Incoming,
    /// Sent by us (a generated reply)
    Outgoing,
}

/// One message in a stored conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Utc>,

    /// Persisted as `type` to stay compatible with existing history files.
    #[serde(rename = "type")]
    pub role: TurnRole,

    pub content: String,
}

impl ConversationTurn {
    /// A turn received from the chat partner, stamped now.
    pub fn incoming(content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            role: TurnRole::Incoming,
            content: content.into(),
        }
    }

    /// A turn we sent, stamped now.
    pub fn outgoing(content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            role: TurnRole::Outgoing,
            content: content.into(),
        }
    }
}

/// Identifies one conversation: the answering account, the chat, and the
/// chat partner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub identity: String,
    pub chat_id: String,
    pub user_id: String,
}

impl ConversationKey {
    pub fn new(
        identity: impl Into<String>,
        chat_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            chat_id: chat_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.identity, self.chat_id, self.user_id)
    }
}

/// Storage for conversation turns.
///
/// Implementations: JSON file per conversation, in-memory (for testing).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The store name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Append a turn to the end of a conversation.
    async fn append(&self, key: &ConversationKey, turn: ConversationTurn) -> std::result::Result<(), MemoryError>;

    /// The most recent `limit` turns, oldest first.
    async fn history(&self, key: &ConversationKey, limit: usize) -> std::result::Result<Vec<ConversationTurn>, MemoryError>;
}
