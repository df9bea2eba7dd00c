//! 生命周期事件：onCache / onRequest / onSuccess / onError / onFinally。
//!
//! Lifecycle hooks.
//!
//! Each [`EventKind`] has at most one subscriber per [`EventHandlers`] set. A
//! call sees two sets: its per-call overrides and the instance defaults. They
//! fire in a fixed order, **per-call overrides first, then defaults**, and every
//! hook is awaited before the next one runs.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::cache::CacheRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Cache,
    Request,
    Success,
    Error,
    Finally,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Cache => "on_cache",
            EventKind::Request => "on_request",
            EventKind::Success => "on_success",
            EventKind::Error => "on_error",
            EventKind::Finally => "on_finally",
        };
        f.write_str(s)
    }
}

/// Fields shared by every event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMeta<P> {
    pub hash: String,
    pub parameters: P,
    pub is_invalidate: bool,
    pub is_pre_process: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEvent<P, T> {
    pub meta: EventMeta<P>,
    pub cache: CacheRecord<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent<P> {
    pub meta: EventMeta<P>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuccessEvent<P, T> {
    pub meta: EventMeta<P>,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent<P, E> {
    pub meta: EventMeta<P>,
    pub error: E,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinallyEvent<P, T, E> {
    pub meta: EventMeta<P>,
    pub data: Option<T>,
    pub error: Option<E>,
}

/// An async subscriber for events of type `A`.
pub type Hook<A> = Arc<dyn Fn(A) -> BoxFuture<'static, ()> + Send + Sync>;

fn hook<A, F, Fut>(f: F) -> Hook<A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)))
}

/// One optional subscriber per lifecycle event.
pub struct EventHandlers<P, T, E> {
    pub(crate) on_cache: Option<Hook<CacheEvent<P, T>>>,
    pub(crate) on_request: Option<Hook<RequestEvent<P>>>,
    pub(crate) on_success: Option<Hook<SuccessEvent<P, T>>>,
    pub(crate) on_error: Option<Hook<ErrorEvent<P, E>>>,
    pub(crate) on_finally: Option<Hook<FinallyEvent<P, T, E>>>,
}

impl<P, T, E> EventHandlers<P, T, E> {
    pub fn new() -> Self {
        Self {
            on_cache: None,
            on_request: None,
            on_success: None,
            on_error: None,
            on_finally: None,
        }
    }

    pub fn on_cache<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CacheEvent<P, T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_cache = Some(hook(f));
        self
    }

    pub fn on_request<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestEvent<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_request = Some(hook(f));
        self
    }

    pub fn on_success<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(SuccessEvent<P, T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_success = Some(hook(f));
        self
    }

    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ErrorEvent<P, E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_error = Some(hook(f));
        self
    }

    pub fn on_finally<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(FinallyEvent<P, T, E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_finally = Some(hook(f));
        self
    }

    /// Same set without the cache subscriber (invalidating calls never surface cache).
    pub fn without_cache(mut self) -> Self {
        self.on_cache = None;
        self
    }

    pub fn has(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Cache => self.on_cache.is_some(),
            EventKind::Request => self.on_request.is_some(),
            EventKind::Success => self.on_success.is_some(),
            EventKind::Error => self.on_error.is_some(),
            EventKind::Finally => self.on_finally.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        [
            EventKind::Cache,
            EventKind::Request,
            EventKind::Success,
            EventKind::Error,
            EventKind::Finally,
        ]
        .into_iter()
        .all(|k| !self.has(k))
    }
}

impl<P, T, E> Default for EventHandlers<P, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T, E> Clone for EventHandlers<P, T, E> {
    fn clone(&self) -> Self {
        Self {
            on_cache: self.on_cache.clone(),
            on_request: self.on_request.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            on_finally: self.on_finally.clone(),
        }
    }
}

impl<P, T, E> fmt::Debug for EventHandlers<P, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_cache", &self.on_cache.is_some())
            .field("on_request", &self.on_request.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_finally", &self.on_finally.is_some())
            .finish()
    }
}

/// Fires `event` on the per-call hook, then on the default hook.
pub(crate) async fn emit<A: Clone>(
    kind: EventKind,
    per_call: Option<&Hook<A>>,
    defaults: Option<&Hook<A>>,
    event: A,
) {
    let hooks: Vec<&Hook<A>> = per_call.into_iter().chain(defaults).collect();
    tracing::trace!(event = %kind, subscribers = hooks.len(), "emit");
    let mut remaining = hooks.len();
    let mut event = Some(event);
    for h in hooks {
        remaining -= 1;
        // last subscriber takes the event by value
        let ev = if remaining == 0 {
            event.take()
        } else {
            event.clone()
        };
        if let Some(ev) = ev {
            h(ev).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn meta() -> EventMeta<u32> {
        EventMeta {
            hash: "h".into(),
            parameters: 1,
            is_invalidate: false,
            is_pre_process: false,
        }
    }

    #[tokio::test]
    async fn test_per_call_fires_before_defaults() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());
        let per_call: EventHandlers<u32, u32, String> =
            EventHandlers::new().on_success(move |_| {
                let a = a.clone();
                async move { a.lock().unwrap().push("per_call") }
            });
        let defaults: EventHandlers<u32, u32, String> =
            EventHandlers::new().on_success(move |_| {
                let b = b.clone();
                async move { b.lock().unwrap().push("default") }
            });

        emit(
            EventKind::Success,
            per_call.on_success.as_ref(),
            defaults.on_success.as_ref(),
            SuccessEvent { meta: meta(), data: 5 },
        )
        .await;

        assert_eq!(*order.lock().unwrap(), vec!["per_call", "default"]);
    }

    #[test]
    fn test_without_cache_drops_only_cache_hook() {
        let handlers: EventHandlers<u32, u32, String> = EventHandlers::new()
            .on_cache(|_| async {})
            .on_finally(|_| async {});
        assert!(handlers.has(EventKind::Cache));
        let handlers = handlers.without_cache();
        assert!(!handlers.has(EventKind::Cache));
        assert!(handlers.has(EventKind::Finally));
        assert!(!handlers.is_empty());
        assert!(EventHandlers::<u32, u32, String>::new().is_empty());
    }
}
