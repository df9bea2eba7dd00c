//! # task-manager-core
//!
//! 异步任务编排核心：为调用方提供的异步处理函数管理完整的调用生命周期。
//!
//! Asynchronous task-orchestration core. Given a handler that performs one unit
//! of asynchronous work, it fingerprints calls, consults and updates a persistent
//! cache, suppresses redundant identical calls, retries failures and notifies
//! lifecycle hooks, while results of superseded calls never reach
//! externally-visible state.
//!
//! ## Core Philosophy
//!
//! - **Fingerprint identity**: the active call is the one whose hash is recorded; stale continuations are inert
//! - **Cache as optimization**: store failures are logged and degrade to misses, never to errors
//! - **Explicit interception**: every stage answers `Continue | Replace | Suppress`
//! - **No hidden globals**: task identities and cache namespaces live in a [`TaskRegistry`] passed by reference
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use task_manager_core::{CacheConfig, EventHandlers, RequestOptions, TaskConfig, TaskManager};
//!
//! # tokio_test::block_on(async {
//! let config = TaskConfig::new(|(user,): (String,)| async move {
//!     Ok::<_, String>(format!("profile of {}", user))
//! })
//! .retry_on_error(3)
//! .prevent_new_request_duration(Duration::from_millis(500))
//! .cache(CacheConfig::new().with_enabled(true).with_cache_id("profiles"));
//!
//! let manager = TaskManager::new(config).unwrap();
//!
//! let handlers: EventHandlers<(String,), String, String> = EventHandlers::new().on_success(|event| async move {
//!     println!("{} -> {}", event.meta.hash, event.data);
//! });
//! let outcome = manager
//!     .config(RequestOptions::from(handlers))
//!     .unwrap()
//!     .request(("ada".to_string(),))
//!     .await
//!     .unwrap();
//! assert!(outcome.is_success());
//! # });
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`fingerprint`] | Stable call fingerprints |
//! | [`cache`] | Persistent `{data, updatedAt}` cache layer and backends |
//! | [`request`] | Lifecycle orchestrator, configuration and outcomes |
//! | [`interceptors`] | Five-stage interceptor pipeline |
//! | [`events`] | Lifecycle hooks |
//! | [`registry`] | Task identities and shared cache namespaces |
//! | [`task`] | Public task API |
//! | [`types`] | Bounds on parameter, data and error types |

pub mod cache;
pub mod events;
pub mod fingerprint;
pub mod interceptors;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod task;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheRecord, CacheStats};
pub use events::{
    CacheEvent, ErrorEvent, EventHandlers, EventKind, EventMeta, FinallyEvent, RequestEvent,
    SuccessEvent,
};
pub use interceptors::{Intercept, InterceptContext, InterceptStage, Interceptor, Settled};
pub use registry::{StoreRegistry, TaskRegistry};
pub use request::{
    Outcome, OutcomeStatus, RequestDetails, RequestFlags, RequestStatus, TaskConfig, TaskOptions,
};
pub use task::{ConfiguredRequest, RequestOptions, TaskManager};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
