use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use super::configured::{ConfiguredRequest, RequestOptions};
use crate::cache::{CacheLayer, CacheStats, NullStore};
use crate::events::EventHandlers;
use crate::registry::{Registration, TaskRegistry};
use crate::request::{Outcome, RequestCore, RequestDetails, RequestFlags, TaskConfig};
use crate::types::{TaskData, TaskFailure, TaskParams};
use crate::Result;

/// Public task API over one handler.
///
/// ```rust
/// use task_manager_core::{EventHandlers, OutcomeStatus, TaskConfig, TaskManager};
///
/// # tokio_test::block_on(async {
/// let manager = TaskManager::new(TaskConfig::new(|(a, b): (u32, u32)| async move {
///     Ok::<_, String>(a + b)
/// }))
/// .unwrap();
///
/// let outcome = manager.request((1, 2)).await.unwrap();
/// assert_eq!(outcome.status, OutcomeStatus::Succeeded);
/// assert_eq!(outcome.data, Some(3));
///
/// // re-run the last call, skipping the blocking window
/// let again = manager.invalidate(EventHandlers::new()).await.unwrap();
/// assert_eq!(again.and_then(|o| o.data), Some(3));
/// # });
/// ```
pub struct TaskManager<P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    core: RequestCore<P, T, E>,
    registration: Registration,
}

impl<P, T, E> TaskManager<P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    /// Manager backed by its own in-memory registry.
    pub fn new(config: TaskConfig<P, T, E>) -> Result<Self> {
        Self::with_registry(config, &TaskRegistry::in_memory())
    }

    /// Manager registered in `registry`, sharing its cache namespaces.
    ///
    /// Fails when the uid is already held by a live manager.
    pub fn with_registry(config: TaskConfig<P, T, E>, registry: &Arc<TaskRegistry>) -> Result<Self> {
        let uid = config
            .uid
            .clone()
            .unwrap_or_else(|| format!("TM-{}", uuid::Uuid::new_v4()));
        let registration = registry.register(uid)?;

        let cache = if config.cache.enable_cache {
            let backend = registry.stores().store(&config.cache.cache_id);
            CacheLayer::new(config.cache.clone(), backend)
        } else {
            CacheLayer::new(config.cache.clone(), Arc::new(NullStore::new()))
        };
        tracing::debug!(
            uid = registration.uid(),
            cache = cache.backend_name(),
            cache_id = %config.cache.cache_id,
            "task manager created"
        );

        Ok(Self {
            core: RequestCore::new(config, cache),
            registration,
        })
    }

    pub fn uid(&self) -> &str {
        self.registration.uid()
    }

    /// Run a call with default flags. Zeroes the retry counter first.
    pub async fn request(&self, parameters: P) -> Result<Outcome<T, E>> {
        self.core.reset_retries();
        self.core
            .run(parameters, RequestFlags::default(), EventHandlers::new())
            .await
    }

    /// Bind per-call hooks and flags. Conflicting flags fail here, before anything runs.
    pub fn config(&self, options: RequestOptions<P, T, E>) -> Result<ConfiguredRequest<'_, P, T, E>> {
        options.flags.validate()?;
        Ok(ConfiguredRequest::new(self, options))
    }

    /// Re-issue the most recent call, bypassing the blocking guard and the cache
    /// lookup. `Ok(None)` when nothing was ever requested.
    pub async fn invalidate(&self, handlers: EventHandlers<P, T, E>) -> Result<Option<Outcome<T, E>>> {
        let Some(parameters) = self.core.details().parameters else {
            tracing::debug!(uid = self.uid(), "invalidate skipped, no previous call");
            return Ok(None);
        };
        let options = RequestOptions::new()
            .with_flags(RequestFlags::invalidate())
            .with_handlers(handlers);
        self.config(options)?.request(parameters).await.map(Some)
    }

    /// Run the pipeline only to warm the cache. Lifecycle state is left alone.
    pub async fn pre_process(&self, parameters: P) -> Result<Outcome<T, E>> {
        self.core
            .run(parameters, RequestFlags::pre_process(), EventHandlers::new())
            .await
    }

    pub fn reset(&self) {
        self.core.reset();
    }

    pub fn request_details(&self) -> RequestDetails<P> {
        self.core.details()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestDetails<P>> {
        self.core.subscribe()
    }

    /// Fingerprint `parameters` the way calls are keyed.
    pub fn hash(&self, parameters: &P) -> String {
        self.core.hash(parameters)
    }

    pub async fn delete_cache(&self, hash: &str) -> Result<bool> {
        self.core.cache().delete(hash).await
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.core.cache().clear().await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.core.cache().stats()
    }

    pub(crate) fn core(&self) -> &RequestCore<P, T, E> {
        &self.core
    }
}

impl<P, T, E> fmt::Debug for TaskManager<P, T, E>
where
    P: TaskParams + fmt::Debug,
    T: TaskData,
    E: TaskFailure,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskManager")
            .field("uid", &self.uid())
            .field("request_details", &self.request_details())
            .finish()
    }
}
