//! Single-slot result cache with TTL and self-healing reads.
//!
//! The most recent completed scan is stored as one JSON document:
//!
//! ```text
//! { "results": <ScanResult>, "cached_at": <rfc3339>, "expires_at": <rfc3339> }
//! ```
//!
//! A read returns the scan only when the document is structurally valid and
//! younger than the TTL. Expired or corrupt documents are deleted before the
//! miss is reported, so a bad entry is never served twice.
//!
//! Concurrent misses each run their own scan; nothing serializes scan
//! execution, so two requests arriving on a cold cache both pay for a full
//! universe scan and the later write wins.
//!
//! When the backend cannot be opened the cache runs disabled: reads miss,
//! writes are dropped, and every request rescans.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warren_common::config::CacheConfig;
use warren_common::util::round_to;
use warren_common::Error;

use super::local_storage::{CacheBackend, MemoryBlobStore, SqliteBlobStore};
use crate::screener::ScanResult;

/// Keys every stored document must carry.
const REQUIRED_KEYS: &[&str] = &["results", "cached_at", "expires_at"];

/// Stored cache document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub results: ScanResult,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at >= ttl
    }
}

/// Snapshot of the cache slot for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub cache_enabled: bool,
    pub backend: Option<&'static str>,
    pub ttl_hours: f64,
    pub cache_exists: bool,
    /// False when a document exists but cannot be decoded
    pub is_valid: bool,
    pub is_expired: bool,
    pub cached_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub time_remaining_hours: Option<f64>,
    pub total_analyzed: Option<usize>,
    pub candidates_count: Option<usize>,
}

/// Check required keys, then decode.
fn decode_entry(payload: &str) -> Result<CacheEntry, String> {
    let value: Value = serde_json::from_str(payload).map_err(|e| e.to_string())?;

    let object = value
        .as_object()
        .ok_or_else(|| "cache document is not an object".to_string())?;

    if let Some(missing) = REQUIRED_KEYS.iter().find(|k| !object.contains_key(**k)) {
        return Err(format!("missing key '{missing}'"));
    }

    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Result cache over a pluggable blob backend.
pub struct ResultCache {
    backend: Option<Arc<dyn CacheBackend>>,
    key: String,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            key: key.into(),
            ttl,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            key: String::new(),
            ttl: Duration::zero(),
        }
    }

    /// Build from config, degrading to [`ResultCache::disabled`] when the
    /// backend cannot be opened.
    pub fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            info!("Result cache disabled by configuration");
            return Self::disabled();
        }

        let ttl = Duration::hours(i64::try_from(config.ttl_hours).unwrap_or(i64::MAX / 3_600_000));

        let backend: Arc<dyn CacheBackend> = match config.backend.to_lowercase().as_str() {
            "memory" => Arc::new(MemoryBlobStore::new()),
            _ => {
                let path = config.resolved_db_path();
                match SqliteBlobStore::open(&path) {
                    Ok(store) => Arc::new(store),
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "Cache backend unavailable, running without cache"
                        );
                        return Self::disabled();
                    }
                }
            }
        };

        Self::new(backend, config.key.clone(), ttl)
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached scan if present, valid, and within TTL.
    pub async fn read(&self) -> Option<ScanResult> {
        self.read_at(Utc::now()).await
    }

    /// [`ResultCache::read`] against an explicit clock.
    pub async fn read_at(&self, now: DateTime<Utc>) -> Option<ScanResult> {
        let backend = self.backend.as_ref()?;

        let payload = match backend.get(&self.key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(key = %self.key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let entry = match decode_entry(&payload) {
            Ok(entry) => entry,
            Err(reason) => {
                warn!(key = %self.key, reason = %reason, "Corrupt cache entry, deleting");
                self.evict().await;
                return None;
            }
        };

        if entry.is_expired(now, self.ttl) {
            info!(
                key = %self.key,
                cached_at = %entry.cached_at,
                "Cache entry expired, deleting"
            );
            self.evict().await;
            return None;
        }

        let age_minutes = (now - entry.cached_at).num_minutes();
        info!(key = %self.key, age_minutes, "Serving scan from cache");

        let mut result = entry.results;
        result.from_cache = true;
        Some(result)
    }

    /// Store a scan stamped with the current time. Returns whether it was stored.
    pub async fn write(&self, result: &ScanResult) -> bool {
        self.write_at(result, Utc::now()).await
    }

    /// [`ResultCache::write`] against an explicit clock.
    pub async fn write_at(&self, result: &ScanResult, now: DateTime<Utc>) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        let mut stored = result.clone();
        stored.from_cache = false;

        let entry = CacheEntry {
            results: stored,
            cached_at: now,
            expires_at: now + self.ttl,
        };

        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to encode cache entry");
                return false;
            }
        };

        match backend.put(&self.key, &payload).await {
            Ok(()) => {
                info!(
                    key = %self.key,
                    candidates = result.candidates_count,
                    expires_at = %entry.expires_at,
                    "Scan cached"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "Cache write failed");
                false
            }
        }
    }

    /// Inspect the slot without modifying it.
    pub async fn status(&self) -> CacheStatus {
        self.status_at(Utc::now()).await
    }

    /// [`ResultCache::status`] against an explicit clock.
    pub async fn status_at(&self, now: DateTime<Utc>) -> CacheStatus {
        let mut status = CacheStatus {
            cache_enabled: self.is_enabled(),
            backend: self.backend.as_ref().map(|b| b.name()),
            ttl_hours: self.ttl.num_minutes() as f64 / 60.0,
            cache_exists: false,
            is_valid: false,
            is_expired: false,
            cached_at: None,
            expires_at: None,
            time_remaining_hours: None,
            total_analyzed: None,
            candidates_count: None,
        };

        let Some(backend) = self.backend.as_ref() else {
            return status;
        };

        let payload = match backend.get(&self.key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return status,
            Err(e) => {
                warn!(error = %e, "Cache status read failed");
                return status;
            }
        };

        status.cache_exists = true;

        match decode_entry(&payload) {
            Ok(entry) => {
                let remaining = entry.expires_at - now;
                status.is_valid = true;
                status.is_expired = entry.is_expired(now, self.ttl);
                status.cached_at = Some(entry.cached_at);
                status.expires_at = Some(entry.expires_at);
                status.time_remaining_hours =
                    Some(round_to((remaining.num_seconds() as f64 / 3600.0).max(0.0), 2));
                status.total_analyzed = Some(entry.results.total_analyzed);
                status.candidates_count = Some(entry.results.candidates_count);
            }
            Err(_) => status.is_expired = true,
        }

        status
    }

    /// Delete the slot. Idempotent; returns whether an entry existed.
    pub async fn clear(&self) -> Result<bool, Error> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| Error::Unavailable("result cache is disabled".into()))?;

        let removed = backend
            .delete(&self.key)
            .await
            .map_err(|e| Error::Cache(e.to_string()))?;

        if removed {
            info!(key = %self.key, "Cache cleared");
        }
        Ok(removed)
    }

    async fn evict(&self) {
        if let Some(backend) = self.backend.as_ref() {
            if let Err(e) = backend.delete(&self.key).await {
                warn!(error = %e, "Failed to delete stale cache entry");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
