//! Store registry: one backend per cache namespace.

use crate::cache::{CacheBackend, FileStore, MemoryStore, NullStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Environment variable naming the root directory of file-backed stores.
pub const CACHE_DIR_ENV: &str = "TASK_MANAGER_CACHE_DIR";

/// How namespaces are materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    /// Process-local LRU stores.
    Memory { max_entries: usize },
    /// One directory per namespace under `root`.
    File { root: PathBuf },
}

/// Hands out one shared backend per `cache_id`.
///
/// Instances that use the same namespace share records; there is no cross-instance
/// locking, the last write to a key wins.
pub struct StoreRegistry {
    kind: StoreKind,
    stores: Mutex<HashMap<String, Arc<dyn CacheBackend>>>,
}

impl StoreRegistry {
    pub fn new(kind: StoreKind) -> Self {
        Self {
            kind,
            stores: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(StoreKind::Memory {
            max_entries: MemoryStore::DEFAULT_CAPACITY,
        })
    }

    pub fn file_backed(root: impl Into<PathBuf>) -> Self {
        Self::new(StoreKind::File { root: root.into() })
    }

    /// File-backed stores rooted at `TASK_MANAGER_CACHE_DIR`, or under the system
    /// temp directory when unset.
    pub fn from_env() -> Self {
        let root = std::env::var(CACHE_DIR_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("task-manager-core"));
        Self::file_backed(root)
    }

    pub fn kind(&self) -> &StoreKind {
        &self.kind
    }

    /// Backend for `cache_id`, opening it on first use.
    ///
    /// A namespace that cannot be opened degrades to a [`NullStore`].
    pub fn store(&self, cache_id: &str) -> Arc<dyn CacheBackend> {
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = stores.get(cache_id) {
            return existing.clone();
        }

        let store: Arc<dyn CacheBackend> = match &self.kind {
            StoreKind::Memory { max_entries } => Arc::new(MemoryStore::new(*max_entries)),
            StoreKind::File { root } => match FileStore::open(root.join(cache_id)) {
                Ok(fs) => Arc::new(fs),
                Err(e) => {
                    tracing::warn!(cache_id, error = %e, "cache store unavailable, caching disabled for namespace");
                    Arc::new(NullStore::new())
                }
            },
        };
        tracing::debug!(cache_id, backend = store.name(), "opened cache namespace");
        stores.insert(cache_id.to_string(), store.clone());
        store
    }

    /// Forget a namespace. Existing holders keep their handle.
    pub fn release(&self, cache_id: &str) -> bool {
        self.stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(cache_id)
            .is_some()
    }

    pub fn namespaces(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_namespace_shares_backend() {
        let reg = StoreRegistry::in_memory();
        let a = reg.store("users");
        let b = reg.store("users");
        a.set("k", b"v").await.unwrap();
        assert_eq!(b.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(reg.store("orders").get("k").await.unwrap().is_none());
        assert_eq!(reg.namespaces(), vec!["orders".to_string(), "users".to_string()]);
    }

    #[test]
    fn test_unopenable_namespace_degrades_to_null_store() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let reg = StoreRegistry::file_backed(&file);
        assert_eq!(reg.store("ns").name(), "null");
    }

    #[test]
    fn test_release_forgets_namespace() {
        let reg = StoreRegistry::in_memory();
        let _ = reg.store("ns");
        assert!(reg.release("ns"));
        assert!(!reg.release("ns"));
        assert!(reg.namespaces().is_empty());
    }
}
