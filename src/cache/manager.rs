//! Cache layer: typed records, TTL and best-effort writes over a backend.

use super::backend::CacheBackend;
use super::record::CacheRecord;
use crate::utils::clock;
use crate::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enable_cache: bool,
    /// Namespace of the persistent store.
    pub cache_id: String,
    /// Records older than this are treated as absent. `None` or zero disables expiry.
    pub cache_expiry: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_cache: false,
            cache_id: Self::DEFAULT_CACHE_ID.to_string(),
            cache_expiry: None,
        }
    }
}

impl CacheConfig {
    pub const DEFAULT_CACHE_ID: &'static str = "db-default";

    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }
    pub fn with_cache_id(mut self, id: impl Into<String>) -> Self {
        self.cache_id = id.into();
        self
    }
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.cache_expiry = Some(expiry);
        self
    }

    /// Expiry rule: `now - updated_at > cache_expiry`.
    pub fn is_expired(&self, updated_at: u64) -> bool {
        match self.cache_expiry {
            Some(ttl) if !ttl.is_zero() => clock::elapsed_ms(updated_at) > clock::duration_ms(ttl),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Typed view over one backend namespace.
///
/// Reads and writes never fail from the caller's point of view: backend and decoding
/// problems are logged and counted, and the layer behaves as a miss / dropped write.
pub struct CacheLayer<T> {
    config: CacheConfig,
    backend: Option<Arc<dyn CacheBackend>>,
    stats: Arc<AtomicStats>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for CacheLayer<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            backend: self.backend.clone(),
            stats: self.stats.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> CacheLayer<T> {
    pub fn new(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        let backend = config.enable_cache.then_some(backend);
        Self {
            config,
            backend,
            stats: Arc::new(AtomicStats::default()),
            _marker: PhantomData,
        }
    }

    /// A layer that never stores anything.
    pub fn disabled() -> Self {
        Self {
            config: CacheConfig::default(),
            backend: None,
            stats: Arc::new(AtomicStats::default()),
            _marker: PhantomData,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map(|b| b.name()).unwrap_or("disabled")
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let Some(backend) = &self.backend else {
            return Ok(false);
        };
        let deleted = backend.delete(key).await.map_err(|e| {
            AtomicStats::bump(&self.stats.errors);
            e
        })?;
        if deleted {
            AtomicStats::bump(&self.stats.deletes);
        }
        Ok(deleted)
    }

    pub async fn clear(&self) -> Result<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        backend.clear().await.map_err(|e| {
            AtomicStats::bump(&self.stats.errors);
            e
        })
    }
}

impl<T: Serialize + DeserializeOwned> CacheLayer<T> {
    /// Non-expired record for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<CacheRecord<T>> {
        let backend = self.backend.as_ref()?;

        let bytes = match backend.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                AtomicStats::bump(&self.stats.misses);
                return None;
            }
            Err(e) => {
                AtomicStats::bump(&self.stats.errors);
                tracing::warn!(cache_id = %self.config.cache_id, key, error = %e, "cache read failed");
                return None;
            }
        };

        let record: CacheRecord<T> = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                AtomicStats::bump(&self.stats.errors);
                tracing::warn!(cache_id = %self.config.cache_id, key, error = %e, "cache record is corrupt");
                return None;
            }
        };

        if self.config.is_expired(record.updated_at) {
            AtomicStats::bump(&self.stats.expired);
            AtomicStats::bump(&self.stats.misses);
            return None;
        }

        AtomicStats::bump(&self.stats.hits);
        Some(record)
    }

    /// Best-effort write.
    pub async fn set(&self, key: &str, record: &CacheRecord<T>) {
        let Some(backend) = &self.backend else {
            return;
        };

        let bytes = match serde_json::to_vec(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                AtomicStats::bump(&self.stats.errors);
                tracing::warn!(cache_id = %self.config.cache_id, key, error = %e, "cache record is not serializable");
                return;
            }
        };

        match backend.set(key, &bytes).await {
            Ok(()) => AtomicStats::bump(&self.stats.sets),
            Err(e) => {
                AtomicStats::bump(&self.stats.errors);
                tracing::warn!(cache_id = %self.config.cache_id, key, error = %e, "cache write failed");
            }
        }
    }
}
