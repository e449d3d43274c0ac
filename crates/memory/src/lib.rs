//! Response cache and conversation history stores for the auto-responder.

pub mod noop;
pub mod in_memory;
pub mod file_history;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use noop::NoopCache;
pub use in_memory::{InMemoryCache, InMemoryHistory};
pub use file_history::FileHistory;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCache;

use sha2::{Digest, Sha256};

/// Cache key for a prompt: lower-case hex SHA-256 of its UTF-8 bytes.
pub fn prompt_hash(prompt: &str) -> String {
    hex::encode(Sha256::digest(prompt.as_bytes()))
}
