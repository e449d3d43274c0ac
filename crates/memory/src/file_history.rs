//! File-based conversation history — one JSON array per conversation.
//!
//! Storage location: `<dir>/<identity>_<chat_id>_<user_id>.json`, each file a
//! list of `{ "timestamp", "type", "content" }` turns, oldest first.

use async_trait::async_trait;
use responder_core::conversation::{ConversationKey, ConversationStore, ConversationTurn};
use responder_core::error::MemoryError;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A directory of per-conversation JSON files.
///
/// Appends are read-modify-write under one mutex so two tasks appending to
/// the same conversation never drop a turn.
pub struct FileHistory {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file holding `key`'s turns.
    pub fn path_for(&self, key: &ConversationKey) -> PathBuf {
        let file_name: String = key
            .to_string()
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }

    /// Turns stored at `path`. Only a missing file reads as empty; an
    /// unreadable or corrupted file is an error so it is never overwritten.
    fn read_turns(path: &Path) -> Result<Vec<ConversationTurn>, MemoryError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MemoryError::Storage(format!(
                    "Failed to read conversation file {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Corrupted conversation file");
            MemoryError::Storage(format!(
                "Corrupted conversation file {}: {e}",
                path.display()
            ))
        })
    }
}

#[async_trait]
impl ConversationStore for FileHistory {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, key: &ConversationKey, turn: ConversationTurn) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(key);

        let mut turns = Self::read_turns(&path)?;
        turns.push(turn);

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            MemoryError::Storage(format!("Failed to create history directory: {e}"))
        })?;
        let content = serde_json::to_string_pretty(&turns)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize conversation: {e}")))?;
        std::fs::write(&path, content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write conversation file: {e}")))?;

        debug!(conversation = %key, turns = turns.len(), "Appended conversation turn");
        Ok(())
    }

    async fn history(
        &self,
        key: &ConversationKey,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, MemoryError> {
        let mut turns = Self::read_turns(&self.path_for(key))?;
        let skip = turns.len().saturating_sub(limit);
        Ok(turns.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use responder_core::conversation::TurnRole;

    #[tokio::test]
    async fn append_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let key = ConversationKey::new("rina", "42", "7");

        let store = FileHistory::new(dir.path());
        store.append(&key, ConversationTurn::incoming("Halo")).await.unwrap();
        store.append(&key, ConversationTurn::outgoing("Halo juga!")).await.unwrap();
        assert!(dir.path().join("rina_42_7.json").exists());

        let reopened = FileHistory::new(dir.path());
        let turns = reopened.history(&key, 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::Incoming);
        assert_eq!(turns[1].content, "Halo juga!");
    }

    #[tokio::test]
    async fn history_is_bounded_to_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistory::new(dir.path());
        let key = ConversationKey::new("rina", "1", "2");
        for i in 0..12 {
            store.append(&key, ConversationTurn::incoming(format!("m{i}"))).await.unwrap();
        }
        let turns = store.history(&key, 10).await.unwrap();
        assert_eq!(turns.len(), 10);
        assert_eq!(turns[0].content, "m2");
        assert_eq!(turns[9].content, "m11");
    }

    #[tokio::test]
    async fn file_uses_type_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistory::new(dir.path());
        let key = ConversationKey::new("a", "b", "c");
        store.append(&key, ConversationTurn::outgoing("ok")).await.unwrap();

        let raw = std::fs::read_to_string(store.path_for(&key)).unwrap();
        assert!(raw.contains(r#""type": "outgoing""#));
    }

    #[tokio::test]
    async fn corrupted_file_is_reported_and_left_intact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistory::new(dir.path());
        let key = ConversationKey::new("a", "b", "c");
        let path = store.path_for(&key);
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(store.history(&key, 10).await, Err(MemoryError::Storage(_))));
        assert!(matches!(
            store.append(&key, ConversationTurn::incoming("Halo")).await,
            Err(MemoryError::Storage(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }

    #[tokio::test]
    async fn unreadable_path_is_an_error_not_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistory::new(dir.path());
        let key = ConversationKey::new("a", "b", "c");
        // A directory where the file should be fails to read with an error
        // other than NotFound.
        std::fs::create_dir_all(store.path_for(&key)).unwrap();

        assert!(store.history(&key, 10).await.is_err());
        assert!(store.append(&key, ConversationTurn::incoming("Halo")).await.is_err());
        assert!(store.path_for(&key).is_dir());
    }

    #[tokio::test]
    async fn missing_conversation_is_empty() {
        let store = FileHistory::new("/nonexistent/conversations");
        let key = ConversationKey::new("a", "b", "c");
        assert!(store.history(&key, 3).await.unwrap().is_empty());
    }

    #[test]
    fn path_separators_are_replaced() {
        let store = FileHistory::new("/data");
        let key = ConversationKey::new("a/b", "c", "d");
        assert_eq!(store.path_for(&key), PathBuf::from("/data/a_b_c_d.json"));
    }
}
