//! Per-instance configuration.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::options::TaskOptions;
use crate::cache::CacheConfig;
use crate::events::EventHandlers;
use crate::fingerprint::ParamsStringifier;
use crate::interceptors::{Interceptor, InterceptorPipeline};
use crate::types::{TaskData, TaskFailure, TaskParams};

/// The unit of asynchronous work being orchestrated.
pub type Handler<P, T, E> = Arc<dyn Fn(P) -> BoxFuture<'static, std::result::Result<T, E>> + Send + Sync>;

/// Immutable configuration of one task manager.
///
/// ```rust
/// use std::time::Duration;
/// use task_manager_core::{CacheConfig, TaskConfig};
///
/// let config: TaskConfig<(u32,), String, String> = TaskConfig::new(|(id,): (u32,)| async move {
///     Ok(format!("user-{}", id))
/// })
/// .retry_on_error(3)
/// .retry_on_error_delay(Duration::from_millis(100))
/// .prevent_new_request_duration(Duration::from_secs(1))
/// .cache(CacheConfig::new().with_enabled(true).with_cache_id("users"));
/// assert_eq!(config.retry_on_error_count(), 3);
/// ```
pub struct TaskConfig<P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    pub(crate) handler: Handler<P, T, E>,
    pub(crate) uid: Option<String>,
    pub(crate) retry_on_error: u32,
    pub(crate) retry_on_error_delay: Option<Duration>,
    pub(crate) prevent_new_request_duration: Option<Duration>,
    pub(crate) cache: CacheConfig,
    pub(crate) default_handlers: EventHandlers<P, T, E>,
    pub(crate) interceptors: InterceptorPipeline<P, T, E>,
    pub(crate) stringifier: Option<ParamsStringifier<P>>,
}

impl<P, T, E> TaskConfig<P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |parameters| Box::pin(handler(parameters))),
            uid: None,
            retry_on_error: 0,
            retry_on_error_delay: None,
            prevent_new_request_duration: None,
            cache: CacheConfig::default(),
            default_handlers: EventHandlers::new(),
            interceptors: InterceptorPipeline::new(),
            stringifier: None,
        }
    }

    /// Registry identity. Generated when absent.
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Attempt budget for failing calls. `0` and `1` both mean a single attempt.
    pub fn retry_on_error(mut self, attempts: u32) -> Self {
        self.retry_on_error = attempts;
        self
    }

    pub fn retry_on_error_delay(mut self, delay: Duration) -> Self {
        self.retry_on_error_delay = Some(delay);
        self
    }

    /// Window during which a repeated identical call is blocked.
    pub fn prevent_new_request_duration(mut self, window: Duration) -> Self {
        self.prevent_new_request_duration = Some(window);
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Hooks invoked for every call, after any per-call overrides.
    pub fn default_handlers(mut self, handlers: EventHandlers<P, T, E>) -> Self {
        self.default_handlers = handlers;
        self
    }

    /// Append an interceptor. Interceptors run in the order they are added.
    pub fn interceptor<I: Interceptor<P, T, E> + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors = self.interceptors.with(interceptor);
        self
    }

    pub fn interceptors(mut self, pipeline: InterceptorPipeline<P, T, E>) -> Self {
        self.interceptors = pipeline;
        self
    }

    /// Replace the canonical parameter serialization used for fingerprints.
    pub fn params_string<F>(mut self, f: F) -> Self
    where
        F: Fn(&P) -> String + Send + Sync + 'static,
    {
        self.stringifier = Some(Arc::new(f));
        self
    }

    /// Apply data-only options on top of this configuration.
    pub fn with_options(mut self, options: &TaskOptions) -> Self {
        if let Some(uid) = &options.uid {
            self.uid = Some(uid.clone());
        }
        self.retry_on_error = options.retry_on_error;
        if let Some(delay) = options.retry_on_error_delay() {
            self.retry_on_error_delay = Some(delay);
        }
        if let Some(window) = options.prevent_new_request_duration() {
            self.prevent_new_request_duration = Some(window);
        }
        self.cache = options.cache_config();
        self
    }

    pub fn retry_on_error_count(&self) -> u32 {
        self.retry_on_error
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache
    }
}

impl<P, T, E> fmt::Debug for TaskConfig<P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskConfig")
            .field("uid", &self.uid)
            .field("retry_on_error", &self.retry_on_error)
            .field("retry_on_error_delay", &self.retry_on_error_delay)
            .field("prevent_new_request_duration", &self.prevent_new_request_duration)
            .field("cache", &self.cache)
            .field("default_handlers", &self.default_handlers)
            .field("interceptors", &self.interceptors.len())
            .field("custom_params_string", &self.stringifier.is_some())
            .finish()
    }
}
