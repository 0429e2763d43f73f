//! Persistent blob storage for the result cache.
//!
//! The cache keeps a single JSON document under a well-known key. Backends
//! only store and return opaque strings; expiry and structural checks live in
//! [`super::cache::ResultCache`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

// ============================================================================
// Database Schema
// ============================================================================

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS result_cache (
    cache_key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP
);
"#;

// ============================================================================
// Backend Trait
// ============================================================================

/// Key/value blob store used by the result cache.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logs and status output.
    fn name(&self) -> &'static str;

    /// Read the payload stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the payload stored under `key` in a single write.
    async fn put(&self, key: &str, payload: &str) -> Result<()>;

    /// Delete `key`. Returns whether an entry existed.
    async fn delete(&self, key: &str) -> Result<bool>;
}

// ============================================================================
// SQLite Backend
// ============================================================================

/// SQLite-backed blob store.
pub struct SqliteBlobStore {
    /// rusqlite::Connection is Send but not Sync, so it sits behind a Mutex.
    db: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteBlobStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(&path).context("Failed to open cache database")?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("Failed to set database pragmas")?;

        conn.execute_batch(CREATE_TABLES_SQL)
            .context("Failed to create cache table")?;

        info!(path = %path.display(), "Result cache database opened");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CacheBackend for SqliteBlobStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;

        let result: rusqlite::Result<String> = db.query_row(
            "SELECT payload FROM result_cache WHERE cache_key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(payload) => Ok(Some(payload)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to read cache entry"),
        }
    }

    async fn put(&self, key: &str, payload: &str) -> Result<()> {
        let db = self.db.lock().await;

        db.execute(
            r#"
            INSERT OR REPLACE INTO result_cache (cache_key, payload, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            "#,
            params![key, payload],
        )
        .context("Failed to write cache entry")?;

        debug!(key, bytes = payload.len(), "Cache entry written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let db = self.db.lock().await;

        let removed = db
            .execute("DELETE FROM result_cache WHERE cache_key = ?1", params![key])
            .context("Failed to delete cache entry")?;

        Ok(removed > 0)
    }
}

// ============================================================================
// In-Memory Backend
// ============================================================================

/// Process-local blob store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, payload: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn exercise(backend: &dyn CacheBackend) {
        assert_eq!(backend.get("k").await.unwrap(), None);

        backend.put("k", r#"{"a":1}"#).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some(r#"{"a":1}"#));

        backend.put("k", r#"{"a":2}"#).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some(r#"{"a":2}"#));

        assert!(backend.delete("k").await.unwrap());
        assert!(!backend.delete("k").await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let dir = tempdir().unwrap();
        let store = SqliteBlobStore::open(dir.path().join("nested").join("cache.db")).unwrap();
        assert_eq!(store.name(), "sqlite");
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = SqliteBlobStore::open(&path).unwrap();
            store.put("screener_results", "payload").await.unwrap();
        }

        let reopened = SqliteBlobStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("screener_results").await.unwrap().as_deref(),
            Some("payload")
        );
    }

    #[tokio::test]
    async fn test_memory_round_trip() {
        exercise(&MemoryBlobStore::new()).await;
    }

    #[test]
    fn test_open_fails_on_directory_path() {
        let dir = tempdir().unwrap();
        assert!(SqliteBlobStore::open(dir.path()).is_err());
    }
}
