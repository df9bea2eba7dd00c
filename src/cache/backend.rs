//! Cache backend implementations.
//!
//! A backend is one key-value namespace (one `cache_id`). Values are opaque
//! bytes; record layout and expiry live in [`super::CacheLayer`].

use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

/// Bounded in-process store. Least recently used keys are evicted first.
pub struct MemoryStore {
    entries: Mutex<LruCache<String, Vec<u8>>>,
}

impl MemoryStore {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CacheBackend for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries().get(key).cloned())
    }
    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries().put(key.to_string(), value.to_vec());
        Ok(())
    }
    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries().pop(key).is_some())
    }
    async fn clear(&self) -> Result<()> {
        self.entries().clear();
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(self.entries().len())
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Persistent store: one JSON file per key under a namespace directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    const EXTENSION: &'static str = "json";

    /// Open (creating if needed) the namespace directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::cache_with_context(
                format!("cannot open store directory: {}", e),
                ErrorContext::new()
                    .with_details(dir.display().to_string())
                    .with_source("file_store"),
            )
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        let file = if safe {
            key.to_string()
        } else {
            crate::fingerprint::digest(key)
        };
        self.dir.join(format!("{}.{}", file, Self::EXTENSION))
    }

    fn is_entry(path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(Self::EXTENSION)
    }
}

#[async_trait]
impl CacheBackend for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                tracing::debug!(path = %tmp.display(), error = %cleanup, "stale temp file left behind");
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if Self::is_entry(&path) {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let mut count = 0;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            if Self::is_entry(&entry.path()) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// No-op store. Used when caching is disabled or the real store cannot be opened.
pub struct NullStore;
impl NullStore {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullStore {
    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
    async fn set(&self, _: &str, _: &[u8]) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _: &str) -> Result<bool> {
        Ok(false)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_evicts_least_recently_used() {
        let store = MemoryStore::new(2);
        store.set("a", b"1").await.unwrap();
        store.set("b", b"2").await.unwrap();
        // touch "a" so "b" becomes the eviction candidate
        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
        store.set("c", b"3").await.unwrap();
        assert!(store.get("b").await.unwrap().is_none());
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_file_store_roundtrip_and_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path().join("ns")).unwrap();
        store.set("abc123", br#"{"x":1}"#).await.unwrap();
        store.set("not/a safe key", b"2").await.unwrap();
        assert_eq!(store.get("abc123").await.unwrap(), Some(br#"{"x":1}"#.to_vec()));
        assert_eq!(store.get("not/a safe key").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len().await.unwrap(), 2);

        assert!(store.delete("abc123").await.unwrap());
        assert!(!store.delete("abc123").await.unwrap());

        store.clear().await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_failed_write_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path().join("ns")).unwrap();
        // a non-empty directory where the record should land makes the rename fail
        let occupied = store.dir().join("key.json");
        std::fs::create_dir(&occupied).unwrap();
        std::fs::write(occupied.join("inner"), b"x").unwrap();

        assert!(store.set("key", b"1").await.is_err());

        let leftovers = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_file_store_open_fails_under_a_regular_file() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let err = FileStore::open(blocker.join("ns")).err();
        assert!(matches!(err, Some(Error::Cache { .. })));
    }

    #[tokio::test]
    async fn test_null_store_is_inert() {
        let store = NullStore::new();
        store.set("k", b"v").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert_eq!(store.name(), "null");
    }
}
