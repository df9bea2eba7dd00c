//! 注册表：显式传递的任务与缓存命名空间注册表（替代全局单例）。
//!
//! Registries passed explicitly to task constructors.
//!
//! - [`StoreRegistry`] maps a `cache_id` to one shared [`crate::cache::CacheBackend`].
//! - [`TaskRegistry`] owns a store registry and the set of live task uids;
//!   uids are released when the owning task is dropped.

mod stores;
mod tasks;

pub use stores::{StoreKind, StoreRegistry, CACHE_DIR_ENV};
pub use tasks::{Registration, TaskRegistry};
