//! Enrichment cache
//!
//! One key-value slot per record: `species_cache:<record id>` holds the JSON
//! serialization of the most recent bundle. Writes overwrite unconditionally
//! (last write wins, no merge). Caching is best-effort: storage failures are
//! logged and treated as a miss, never surfaced to callers.

use crate::types::EnrichmentBundle;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Storage key prefix for cached bundles
pub const CACHE_KEY_PREFIX: &str = "species_cache:";

/// Storage key for a record's bundle
pub fn cache_key(record_id: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, record_id)
}

/// Cache storage errors (swallowed by `EnrichmentCache`)
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::Storage(e.to_string())
    }
}

/// String-keyed storage backend
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}

// ============================================================================
// Backends
// ============================================================================

/// Process-local store; contents are lost on restart
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// SQLite-backed store, durable across restarts
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    /// Wrap a pool, creating the cache table if needed
    pub async fn new(pool: SqlitePool) -> Result<Self, CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS species_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Open (or create) the cache database file
    pub async fn open(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::Storage(e.to_string()))?;
        }

        // mode=rwc: read, write, create
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        debug!("Connecting to cache database: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await?;
        Self::new(pool).await
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM species_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        sqlx::query(
            "INSERT INTO species_cache (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Cache layer
// ============================================================================

/// Best-effort bundle cache over a `CacheStore`
pub struct EnrichmentCache {
    store: Box<dyn CacheStore>,
}

impl EnrichmentCache {
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// In-memory cache (tests, or when no database is available)
    pub fn in_memory() -> Self {
        Self::new(MemoryCacheStore::new())
    }

    /// Cached bundle for a record; absent on miss, storage failure, or an
    /// undecodable value
    pub async fn read(&self, record_id: &str) -> Option<EnrichmentBundle> {
        let key = cache_key(record_id);

        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(record_id = %record_id, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(bundle) => {
                debug!(record_id = %record_id, "Cache hit");
                Some(bundle)
            }
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store a bundle, replacing any previous entry
    ///
    /// Returns whether the write reached storage; callers may ignore it.
    pub async fn write(&self, record_id: &str, bundle: &EnrichmentBundle) -> bool {
        match self.try_write(record_id, bundle).await {
            Ok(()) => {
                debug!(record_id = %record_id, "Cache entry stored");
                true
            }
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "Cache write failed, continuing without cache");
                false
            }
        }
    }

    async fn try_write(&self, record_id: &str, bundle: &EnrichmentBundle) -> Result<(), CacheError> {
        let value = serde_json::to_string(bundle)?;
        self.store.set(&cache_key(record_id), value).await
    }

    /// Raw serialized entry (byte-level comparisons in tests and diagnostics)
    pub async fn raw_entry(&self, record_id: &str) -> Option<String> {
        self.store.get(&cache_key(record_id)).await.ok().flatten()
    }
}
