//! SQLite response cache.
//!
//! One table, keyed by the prompt hash:
//!
//! ```sql
//! response_cache(prompt_hash PK, prompt, response, model,
//!                created_at, last_used, use_count)
//! ```
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text so they compare
//! correctly as strings. The hit bump and the upsert are each one statement,
//! so concurrent hits on the same hash never lose a count.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use responder_core::cache::{CacheEntry, CacheStats, ResponseCache};
use responder_core::error::MemoryError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A SQLite-backed [`ResponseCache`].
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (or create) the cache database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful
    /// for tests).
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let cache = Self { pool };
        cache.run_migrations().await?;
        info!("SQLite response cache initialized at {path}");
        Ok(cache)
    }

    /// Open the cache file at `path`, creating parent directories.
    pub async fn open(path: &std::path::Path) -> Result<Self, MemoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create cache directory: {e}"))
            })?;
        }
        Self::new(&format!("sqlite://{}", path.display())).await
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let cache = Self { pool };
        cache.run_migrations().await?;
        Ok(cache)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS response_cache (
                prompt_hash TEXT PRIMARY KEY,
                prompt      TEXT NOT NULL,
                response    TEXT NOT NULL,
                model       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                last_used   TEXT NOT NULL,
                use_count   INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("response_cache table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_response_cache_last_used ON response_cache(last_used)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("last_used index: {e}")))?;

        debug!("SQLite cache migrations complete");
        Ok(())
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<CacheEntry, MemoryError> {
        let col = |name: &str| -> Result<String, MemoryError> {
            row.try_get(name)
                .map_err(|e| MemoryError::QueryFailed(format!("{name} column: {e}")))
        };
        let use_count: i64 = row
            .try_get("use_count")
            .map_err(|e| MemoryError::QueryFailed(format!("use_count column: {e}")))?;

        Ok(CacheEntry {
            prompt_hash: col("prompt_hash")?,
            prompt: col("prompt")?,
            response: col("response")?,
            model: col("model")?,
            created_at: parse_timestamp(&col("created_at")?),
            last_used: parse_timestamp(&col("last_used")?),
            use_count: u32::try_from(use_count).unwrap_or(u32::MAX),
        })
    }
}

/// Fixed-width UTC timestamp, e.g. `2026-10-16T08:30:00.000000Z`.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl ResponseCache for SqliteCache {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn lookup(&self, prompt_hash: &str, ttl: Duration) -> Result<Option<String>, MemoryError> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            UPDATE response_cache
            SET last_used = ?1, use_count = use_count + 1
            WHERE prompt_hash = ?2 AND created_at > ?3
            RETURNING response
            "#,
        )
        .bind(timestamp(now))
        .bind(prompt_hash)
        .bind(timestamp(now - ttl))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Cache lookup failed: {e}")))?;

        row.map(|r| {
            r.try_get::<String, _>("response")
                .map_err(|e| MemoryError::QueryFailed(format!("response column: {e}")))
        })
        .transpose()
    }

    async fn store(
        &self,
        prompt_hash: &str,
        prompt: &str,
        response: &str,
        model: &str,
    ) -> Result<(), MemoryError> {
        let now = timestamp(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO response_cache
                (prompt_hash, prompt, response, model, created_at, last_used, use_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5, 1)
            ON CONFLICT(prompt_hash) DO UPDATE SET
                prompt = excluded.prompt,
                response = excluded.response,
                model = excluded.model,
                created_at = excluded.created_at,
                last_used = excluded.last_used,
                use_count = response_cache.use_count + 1
            "#,
        )
        .bind(prompt_hash)
        .bind(prompt)
        .bind(response)
        .bind(model)
        .bind(now.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Cache store failed: {e}")))?;

        debug!(hash = %prompt_hash, "Stored response in cache");
        Ok(())
    }

    async fn get(&self, prompt_hash: &str) -> Result<Option<CacheEntry>, MemoryError> {
        let row = sqlx::query("SELECT * FROM response_cache WHERE prompt_hash = ?1")
            .bind(prompt_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Cache get failed: {e}")))?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn clean(&self, max_age: Duration) -> Result<u64, MemoryError> {
        let cutoff = timestamp(Utc::now() - max_age);
        let result = sqlx::query("DELETE FROM response_cache WHERE last_used < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Cache clean failed: {e}")))?;

        let removed = result.rows_affected();
        info!(removed, "Cleaned response cache");
        Ok(removed)
    }

    async fn stats(&self) -> Result<CacheStats, MemoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS entries, COALESCE(SUM(use_count), 0) AS total_uses FROM response_cache",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("Cache stats failed: {e}")))?;

        let entries: i64 = row.try_get("entries").unwrap_or(0);
        let total_uses: i64 = row.try_get("total_uses").unwrap_or(0);
        Ok(CacheStats {
            entries: entries.max(0) as u64,
            total_uses: total_uses.max(0) as u64,
        })
    }
}
