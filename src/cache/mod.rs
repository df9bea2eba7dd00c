//! 持久化缓存层：按命名空间存储 `{data, updatedAt}` 记录。
//!
//! # Persistent Cache Layer
//!
//! Wraps a key-value store scoped by a namespace (`cache_id`) and stores
//! `{data, updatedAt}` records keyed by call fingerprint.
//!
//! Caching is strictly an optimization: every failure in this layer is logged
//! and turned into a miss or a dropped write, never into an error seen by
//! request orchestration.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheLayer`] | Typed records, TTL expiry, best-effort writes, statistics |
//! | [`CacheConfig`] | `enable_cache` / `cache_id` / `cache_expiry` |
//! | [`CacheBackend`] | Trait for implementing custom stores |
//! | [`MemoryStore`] | Bounded in-process LRU store |
//! | [`FileStore`] | Persistent store, one JSON file per fingerprint |
//! | [`NullStore`] | No-op store used when caching is off or unavailable |
//! | [`CacheRecord`] | Persisted record layout |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use task_manager_core::cache::{CacheConfig, CacheLayer, CacheRecord, MemoryStore};
//!
//! # tokio_test::block_on(async {
//! let config = CacheConfig::new()
//!     .with_enabled(true)
//!     .with_cache_id("users")
//!     .with_expiry(Duration::from_secs(60));
//! let layer: CacheLayer<String> = CacheLayer::new(config, Arc::new(MemoryStore::default()));
//!
//! layer.set("fingerprint", &CacheRecord::now("alice".to_string())).await;
//! assert_eq!(layer.get("fingerprint").await.map(|r| r.data), Some("alice".to_string()));
//! # });
//! ```

mod backend;
mod manager;
mod record;

pub use backend::{CacheBackend, FileStore, MemoryStore, NullStore};
pub use manager::{CacheConfig, CacheLayer, CacheStats};
pub use record::CacheRecord;
