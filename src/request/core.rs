//! Request lifecycle orchestrator.
//!
//! Drives one call through guard → cache lookup → dispatch → success/failure →
//! retry → finalize. The active call is the one whose fingerprint sits in
//! [`RequestDetails::hash`]; every transition and hook site re-checks that, so a
//! superseded continuation runs to completion without publishing anything.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::config::{Handler, TaskConfig};
use super::details::{RequestDetails, RequestStatus};
use super::flags::RequestFlags;
use super::outcome::{Outcome, OutcomeStatus};
use crate::cache::{CacheLayer, CacheRecord};
use crate::events::{
    emit, CacheEvent, ErrorEvent, EventHandlers, EventKind, EventMeta, FinallyEvent, RequestEvent,
    SuccessEvent,
};
use crate::fingerprint::Fingerprinter;
use crate::interceptors::{Intercept, InterceptContext, InterceptorPipeline, Settled};
use crate::types::{TaskData, TaskFailure, TaskParams};
use crate::utils::clock;
use crate::Result;

/// One logical call as it flows through the pipeline.
struct Call<P, T, E> {
    hash: String,
    parameters: P,
    flags: RequestFlags,
    handlers: EventHandlers<P, T, E>,
    /// Retry accounting for pre-processing, kept off the shared counter.
    retried: AtomicU32,
}

impl<P: Clone, T, E> Call<P, T, E> {
    fn meta(&self) -> EventMeta<P> {
        EventMeta {
            hash: self.hash.clone(),
            parameters: self.parameters.clone(),
            is_invalidate: self.flags.is_invalidate,
            is_pre_process: self.flags.is_pre_process,
        }
    }

    fn context(&self) -> InterceptContext<P> {
        InterceptContext {
            hash: self.hash.clone(),
            parameters: self.parameters.clone(),
            flags: self.flags,
        }
    }
}

enum Step<T, E> {
    Done(Outcome<T, E>),
    Retry,
}

struct Inner<P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    handler: Handler<P, T, E>,
    fingerprinter: Fingerprinter<P>,
    retry_on_error: u32,
    retry_on_error_delay: Option<Duration>,
    prevent_new_request_duration: Option<Duration>,
    cache: CacheLayer<T>,
    interceptors: InterceptorPipeline<P, T, E>,
    defaults: EventHandlers<P, T, E>,
    details: watch::Sender<RequestDetails<P>>,
    retried: AtomicU32,
}

/// Orchestrates calls of one handler. Cheap to clone; clones share state.
pub struct RequestCore<P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    inner: Arc<Inner<P, T, E>>,
}

impl<P, T, E> Clone for RequestCore<P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, T, E> RequestCore<P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    pub fn new(config: TaskConfig<P, T, E>, cache: CacheLayer<T>) -> Self {
        let fingerprinter = match config.stringifier {
            Some(f) => Fingerprinter::with_stringifier(f),
            None => Fingerprinter::new(),
        };
        let (details, _) = watch::channel(RequestDetails::default());
        Self {
            inner: Arc::new(Inner {
                handler: config.handler,
                fingerprinter,
                retry_on_error: config.retry_on_error,
                retry_on_error_delay: config.retry_on_error_delay,
                prevent_new_request_duration: config.prevent_new_request_duration,
                cache,
                interceptors: config.interceptors,
                defaults: config.default_handlers,
                details,
                retried: AtomicU32::new(0),
            }),
        }
    }

    pub fn hash(&self, parameters: &P) -> String {
        self.inner.fingerprinter.hash(parameters)
    }

    /// Snapshot of the lifecycle record.
    pub fn details(&self) -> RequestDetails<P> {
        self.inner.details.borrow().clone()
    }

    /// Receiver that observes every transition.
    pub fn subscribe(&self) -> watch::Receiver<RequestDetails<P>> {
        self.inner.details.subscribe()
    }

    pub fn cache(&self) -> &CacheLayer<T> {
        &self.inner.cache
    }

    pub fn retried_count(&self) -> u32 {
        self.inner.retried.load(Ordering::SeqCst)
    }

    pub fn reset_retries(&self) {
        self.inner.retried.store(0, Ordering::SeqCst);
    }

    /// Back to the empty record with a zeroed retry counter. In-flight work keeps
    /// running but can no longer publish.
    pub fn reset(&self) {
        self.inner.details.send_replace(RequestDetails::default());
        self.reset_retries();
        tracing::debug!("request details reset");
    }

    /// Run one call to its terminal outcome, retries included.
    ///
    /// Handler failures are reported through the outcome and the hooks; `Err` is
    /// reserved for invalid flags and interceptor failures.
    pub async fn run(
        &self,
        parameters: P,
        flags: RequestFlags,
        handlers: EventHandlers<P, T, E>,
    ) -> Result<Outcome<T, E>> {
        flags.validate()?;
        let call = Arc::new(Call {
            hash: self.hash(&parameters),
            parameters,
            flags,
            handlers,
            retried: AtomicU32::new(0),
        });

        let mut retrying = false;
        loop {
            match self.attempt(&call, retrying).await? {
                Step::Done(outcome) => {
                    tracing::debug!(hash = %outcome.hash, outcome = %outcome.status, "call settled");
                    return Ok(outcome);
                }
                Step::Retry => {
                    if let Some(delay) = self.inner.retry_on_error_delay.filter(|d| !d.is_zero()) {
                        tokio::time::sleep(delay).await;
                    }
                    if !self.is_active(&call) {
                        tracing::debug!(hash = %call.hash, "retry abandoned, call superseded");
                        return Ok(Outcome::new(&call.hash, OutcomeStatus::Superseded, None, None));
                    }
                    retrying = true;
                }
            }
        }
    }

    async fn attempt(&self, call: &Arc<Call<P, T, E>>, retrying: bool) -> Result<Step<T, E>> {
        if !call.flags.is_pre_process {
            // a retry continues an admitted call, the guard only screens new ones
            if !retrying && !call.flags.is_invalidate && self.is_prevented(&call.hash) {
                tracing::debug!(hash = %call.hash, status = %RequestStatus::Blocked, "identical call blocked");
                return Ok(Step::Done(Outcome::blocked(&call.hash)));
            }
            self.begin(call);
        }

        let (lookup, cache_read) = if !call.flags.is_invalidate
            && (self.inner.cache.is_enabled() || !self.inner.interceptors.is_empty())
        {
            let (read_done, cache_read) = oneshot::channel();
            (Some(self.spawn_cache_lookup(call, read_done)), Some(cache_read))
        } else {
            (None, None)
        };

        let step = self.dispatch(call, cache_read).await;

        // pre-processing exists to touch the cache, so its lookup settles before returning
        if call.flags.is_pre_process {
            if let Some(lookup) = lookup {
                if let Err(e) = lookup.await {
                    tracing::warn!(hash = %call.hash, error = %e, "cache lookup task failed");
                }
            }
        }
        step
    }

    async fn dispatch(
        &self,
        call: &Call<P, T, E>,
        cache_read: Option<oneshot::Receiver<()>>,
    ) -> Result<Step<T, E>> {
        let ctx = call.context();
        let parameters = match self
            .inner
            .interceptors
            .request(&ctx, call.parameters.clone())
            .await?
        {
            Intercept::Continue(p) | Intercept::Replace(p) => p,
            Intercept::Suppress => {
                self.publish(call, RequestStatus::Blocked);
                return Ok(Step::Done(Outcome::blocked(&call.hash)));
            }
        };

        if !self.gate(call, EventKind::Request) {
            return Ok(Step::Done(Outcome::new(
                &call.hash,
                OutcomeStatus::Superseded,
                None,
                None,
            )));
        }
        emit(
            EventKind::Request,
            call.handlers.on_request.as_ref(),
            self.inner.defaults.on_request.as_ref(),
            RequestEvent { meta: call.meta() },
        )
        .await;

        self.publish(call, RequestStatus::Began);
        match (self.inner.handler)(parameters).await {
            Ok(data) => self.settle_success(call, &ctx, data, cache_read).await,
            Err(error) => self.settle_failure(call, &ctx, error).await,
        }
    }

    async fn settle_success(
        &self,
        call: &Call<P, T, E>,
        ctx: &InterceptContext<P>,
        data: T,
        cache_read: Option<oneshot::Receiver<()>>,
    ) -> Result<Step<T, E>> {
        // the lookup must see the store as it was before this call wrote to it
        if let Some(cache_read) = cache_read {
            if cache_read.await.is_err() {
                tracing::trace!(hash = %call.hash, "cache lookup ended before its read");
            }
        }
        self.inner
            .cache
            .set(&call.hash, &CacheRecord::now(data.clone()))
            .await;

        if !self.is_active(call) {
            tracing::trace!(hash = %call.hash, "stale result discarded");
            return Ok(Step::Done(Outcome::new(
                &call.hash,
                OutcomeStatus::Superseded,
                Some(data),
                None,
            )));
        }
        self.retry_counter(call).store(0, Ordering::SeqCst);
        self.publish(call, RequestStatus::Succeed);

        let (data, status) = match self.inner.interceptors.success(ctx, data.clone()).await? {
            Intercept::Continue(d) | Intercept::Replace(d) => {
                if self.gate(call, EventKind::Success) {
                    emit(
                        EventKind::Success,
                        call.handlers.on_success.as_ref(),
                        self.inner.defaults.on_success.as_ref(),
                        SuccessEvent {
                            meta: call.meta(),
                            data: d.clone(),
                        },
                    )
                    .await;
                }
                (d, OutcomeStatus::Succeeded)
            }
            Intercept::Suppress => (data, OutcomeStatus::Ignored),
        };

        self.finalize(call, ctx, Some(data), None, status).await
    }

    async fn settle_failure(
        &self,
        call: &Call<P, T, E>,
        ctx: &InterceptContext<P>,
        error: E,
    ) -> Result<Step<T, E>> {
        self.publish(call, RequestStatus::Failed);

        let error = match self.inner.interceptors.error(ctx, error.clone()).await? {
            Intercept::Continue(e) | Intercept::Replace(e) => e,
            Intercept::Suppress => {
                return self
                    .finalize(call, ctx, None, Some(error), OutcomeStatus::Ignored)
                    .await;
            }
        };

        if !self.is_active(call) {
            tracing::trace!(hash = %call.hash, "stale failure discarded");
            return Ok(Step::Done(Outcome::new(
                &call.hash,
                OutcomeStatus::Superseded,
                None,
                Some(error),
            )));
        }

        if self.should_retry(call) {
            let retried = self.retry_counter(call).fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(
                hash = %call.hash,
                retried,
                budget = self.inner.retry_on_error,
                error = ?error,
                "handler failed, retrying"
            );
            return Ok(Step::Retry);
        }

        if self.gate(call, EventKind::Error) {
            emit(
                EventKind::Error,
                call.handlers.on_error.as_ref(),
                self.inner.defaults.on_error.as_ref(),
                ErrorEvent {
                    meta: call.meta(),
                    error: error.clone(),
                },
            )
            .await;
        }

        self.finalize(call, ctx, None, Some(error), OutcomeStatus::Failed)
            .await
    }

    async fn finalize(
        &self,
        call: &Call<P, T, E>,
        ctx: &InterceptContext<P>,
        data: Option<T>,
        error: Option<E>,
        status: OutcomeStatus,
    ) -> Result<Step<T, E>> {
        let raw = Settled { data, error };
        let settled = match self.inner.interceptors.finally(ctx, raw.clone()).await? {
            Intercept::Continue(s) | Intercept::Replace(s) => s,
            Intercept::Suppress => {
                return Ok(Step::Done(Outcome::new(&call.hash, status, raw.data, raw.error)));
            }
        };

        if !self.gate(call, EventKind::Finally) {
            return Ok(Step::Done(Outcome::new(
                &call.hash,
                OutcomeStatus::Superseded,
                settled.data,
                settled.error,
            )));
        }
        emit(
            EventKind::Finally,
            call.handlers.on_finally.as_ref(),
            self.inner.defaults.on_finally.as_ref(),
            FinallyEvent {
                meta: call.meta(),
                data: settled.data.clone(),
                error: settled.error.clone(),
            },
        )
        .await;

        Ok(Step::Done(Outcome::new(
            &call.hash,
            status,
            settled.data,
            settled.error,
        )))
    }

    /// Detached cache lookup racing the dispatch. Its only effect is a gated
    /// `on_cache` notification followed by the `cached` transition.
    fn spawn_cache_lookup(
        &self,
        call: &Arc<Call<P, T, E>>,
        read_done: oneshot::Sender<()>,
    ) -> JoinHandle<()> {
        let core = self.clone();
        let call = Arc::clone(call);
        tokio::spawn(async move { core.cache_phase(&call, read_done).await })
    }

    /// `read_done` fires once the store has been read, releasing the success
    /// path's cache write.
    async fn cache_phase(&self, call: &Call<P, T, E>, read_done: oneshot::Sender<()>) {
        let cached = self.inner.cache.get(&call.hash).await;
        if read_done.send(()).is_err() {
            tracing::trace!(hash = %call.hash, "dispatch settled without a pending cache write");
        }
        let cached = match self.inner.interceptors.cache(&call.context(), cached).await {
            Ok(Intercept::Continue(c)) | Ok(Intercept::Replace(c)) => c,
            Ok(Intercept::Suppress) => return,
            Err(e) => {
                tracing::warn!(hash = %call.hash, error = %e, "cache phase dropped");
                return;
            }
        };
        let Some(record) = cached else {
            return;
        };

        if !call.flags.is_pre_process && !self.awaits_result(&call.hash) {
            tracing::trace!(hash = %call.hash, event = %EventKind::Cache, "hook suppressed");
            return;
        }
        emit(
            EventKind::Cache,
            call.handlers.on_cache.as_ref(),
            self.inner.defaults.on_cache.as_ref(),
            CacheEvent {
                meta: call.meta(),
                cache: record,
            },
        )
        .await;
        self.publish(call, RequestStatus::Cached);
    }

    /// Blocking guard. Marks the record blocked when an identical call was
    /// created within the window and neither failed nor was blocked itself.
    fn is_prevented(&self, hash: &str) -> bool {
        let Some(window) = self
            .inner
            .prevent_new_request_duration
            .filter(|w| !w.is_zero())
            .map(clock::duration_ms)
        else {
            return false;
        };
        self.inner.details.send_if_modified(|d| {
            let blocked = d.is_same_request(hash)
                && !d.is_failed
                && !d.is_blocked
                && d.created_at
                    .map_or(false, |created_at| clock::elapsed_ms(created_at) <= window);
            if blocked {
                d.enter(RequestStatus::Blocked, clock::now_ms());
            }
            blocked
        })
    }

    fn begin(&self, call: &Call<P, T, E>) {
        self.inner.details.send_replace(RequestDetails::requested(
            call.parameters.clone(),
            call.hash.clone(),
            clock::now_ms(),
        ));
        tracing::debug!(hash = %call.hash, status = %RequestStatus::Requested, "transition");
    }

    /// Gated transition. Pre-processing never publishes.
    fn publish(&self, call: &Call<P, T, E>, status: RequestStatus) {
        if call.flags.is_pre_process {
            return;
        }
        let applied = self.inner.details.send_if_modified(|d| {
            if !d.is_same_request(&call.hash) || (status == RequestStatus::Cached && d.is_succeed) {
                return false;
            }
            d.enter(status, clock::now_ms());
            true
        });
        if applied {
            tracing::debug!(hash = %call.hash, status = %status, "transition");
        } else {
            tracing::trace!(hash = %call.hash, status = %status, "stale transition dropped");
        }
    }

    fn is_active(&self, call: &Call<P, T, E>) -> bool {
        call.flags.is_pre_process || self.inner.details.borrow().is_same_request(&call.hash)
    }

    fn gate(&self, call: &Call<P, T, E>, kind: EventKind) -> bool {
        let active = self.is_active(call);
        if !active {
            tracing::trace!(hash = %call.hash, event = %kind, "hook suppressed");
        }
        active
    }

    fn awaits_result(&self, hash: &str) -> bool {
        let d = self.inner.details.borrow();
        d.is_same_request(hash) && !d.is_succeed
    }

    /// Pre-processing counts retries per call so it never disturbs a live request's budget.
    fn retry_counter<'a>(&'a self, call: &'a Call<P, T, E>) -> &'a AtomicU32 {
        if call.flags.is_pre_process {
            &call.retried
        } else {
            &self.inner.retried
        }
    }

    fn should_retry(&self, call: &Call<P, T, E>) -> bool {
        let budget = self.inner.retry_on_error;
        budget > 0 && self.retry_counter(call).load(Ordering::SeqCst) + 1 < budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLayer;
    use std::sync::atomic::AtomicUsize;

    fn counting_core(
        window: Option<Duration>,
    ) -> (RequestCore<(u32,), u32, String>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut config = TaskConfig::new(move |(n,): (u32,)| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(n * 10)
            }
        });
        if let Some(window) = window {
            config = config.prevent_new_request_duration(window);
        }
        (RequestCore::new(config, CacheLayer::disabled()), calls)
    }

    #[tokio::test]
    async fn test_success_walks_the_state_machine() {
        let (core, calls) = counting_core(None);
        let outcome = core
            .run((4,), RequestFlags::default(), EventHandlers::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Succeeded);
        assert_eq!(outcome.data, Some(40));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let details = core.details();
        assert_eq!(details.parameters, Some((4,)));
        assert_eq!(details.hash.as_deref(), Some(outcome.hash.as_str()));
        assert_eq!(
            details.procedure,
            vec![
                RequestStatus::Requested,
                RequestStatus::Began,
                RequestStatus::Succeed
            ]
        );
    }

    #[tokio::test]
    async fn test_guard_blocks_identical_call_within_window() {
        let (core, calls) = counting_core(Some(Duration::from_secs(60)));
        core.run((1,), RequestFlags::default(), EventHandlers::new())
            .await
            .unwrap();
        let second = core
            .run((1,), RequestFlags::default(), EventHandlers::new())
            .await
            .unwrap();

        assert!(second.is_blocked());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let details = core.details();
        assert!(details.is_blocked);
        assert_eq!(details.status, Some(RequestStatus::Blocked));

        // a blocked record no longer blocks
        let third = core
            .run((1,), RequestFlags::default(), EventHandlers::new())
            .await
            .unwrap();
        assert!(third.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_bypasses_guard() {
        let (core, calls) = counting_core(Some(Duration::from_secs(60)));
        core.run((1,), RequestFlags::default(), EventHandlers::new())
            .await
            .unwrap();
        let outcome = core
            .run((1,), RequestFlags::invalidate(), EventHandlers::new())
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pre_process_leaves_details_untouched() {
        let (core, calls) = counting_core(Some(Duration::from_secs(60)));
        let outcome = core
            .run((2,), RequestFlags::pre_process(), EventHandlers::new())
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(core.details().is_empty());
    }

    #[tokio::test]
    async fn test_reset_restores_empty_record() {
        let (core, _) = counting_core(None);
        let mut rx = core.subscribe();
        core.run((3,), RequestFlags::default(), EventHandlers::new())
            .await
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, Some(RequestStatus::Succeed));

        core.reset();
        assert_eq!(core.details(), RequestDetails::default());
        assert_eq!(core.retried_count(), 0);
    }

    #[tokio::test]
    async fn test_conflicting_flags_fail_before_dispatch() {
        let (core, calls) = counting_core(None);
        let flags = RequestFlags {
            is_invalidate: true,
            is_pre_process: true,
        };
        let err = core.run((1,), flags, EventHandlers::new()).await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(core.details().is_empty());
    }
}
