//! Five-stage interceptor pipeline (cache, request, success, error, finally).
//!
//! Each stage receives the value flowing through the orchestrator and answers
//! with an explicit [`Intercept`]:
//! - `Continue(v)`: hand the value on (unchanged in spirit)
//! - `Replace(v)`: hand on a rewritten value
//! - `Suppress`: stop here; the orchestrator skips what the stage guards
//!
//! Interceptors run in registration order. The first `Suppress` short-circuits
//! the remaining interceptors of that stage. An `Err` from an interceptor is
//! wrapped in [`crate::Error::Interceptor`] and, except for the detached cache
//! stage, aborts the call.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::cache::CacheRecord;
use crate::request::RequestFlags;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptStage {
    Cache,
    Request,
    Success,
    Error,
    Finally,
}

impl fmt::Display for InterceptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InterceptStage::Cache => "cache",
            InterceptStage::Request => "request",
            InterceptStage::Success => "success",
            InterceptStage::Error => "error",
            InterceptStage::Finally => "finally",
        };
        f.write_str(s)
    }
}

/// Verdict of one interceptor for one value.
#[derive(Debug, Clone, PartialEq)]
pub enum Intercept<V> {
    Continue(V),
    Replace(V),
    Suppress,
}

impl<V> Intercept<V> {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Intercept::Suppress)
    }

    pub fn into_value(self) -> Option<V> {
        match self {
            Intercept::Continue(v) | Intercept::Replace(v) => Some(v),
            Intercept::Suppress => None,
        }
    }
}

/// What the call looked like when it reached the interceptor.
#[derive(Debug, Clone)]
pub struct InterceptContext<P> {
    pub hash: String,
    /// Parameters as passed by the caller (before any request-stage rewrite).
    pub parameters: P,
    pub flags: RequestFlags,
}

/// Terminal data / error pair handed to the finally stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled<T, E> {
    pub data: Option<T>,
    pub error: Option<E>,
}

/// Interceptor for cross-cutting concerns. Every stage defaults to `Continue`.
#[async_trait]
pub trait Interceptor<P, T, E>: Send + Sync
where
    P: Send + Sync + 'static,
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    async fn on_cache(
        &self,
        _ctx: &InterceptContext<P>,
        cache: Option<CacheRecord<T>>,
    ) -> Result<Intercept<Option<CacheRecord<T>>>> {
        Ok(Intercept::Continue(cache))
    }

    /// `Suppress` marks the call as prevented: it is recorded as blocked and never dispatched.
    async fn on_request(&self, _ctx: &InterceptContext<P>, parameters: P) -> Result<Intercept<P>> {
        Ok(Intercept::Continue(parameters))
    }

    /// `Suppress` skips `on_success`; the call still finalizes.
    async fn on_success(&self, _ctx: &InterceptContext<P>, data: T) -> Result<Intercept<T>> {
        Ok(Intercept::Continue(data))
    }

    /// `Suppress` skips retries and `on_error`; the call still finalizes.
    async fn on_error(&self, _ctx: &InterceptContext<P>, error: E) -> Result<Intercept<E>> {
        Ok(Intercept::Continue(error))
    }

    /// `Suppress` skips `on_finally`.
    async fn on_finally(
        &self,
        _ctx: &InterceptContext<P>,
        settled: Settled<T, E>,
    ) -> Result<Intercept<Settled<T, E>>> {
        Ok(Intercept::Continue(settled))
    }
}

/// Ordered interceptor chain.
pub struct InterceptorPipeline<P, T, E>
where
    P: Send + Sync + 'static,
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub(crate) interceptors: Vec<Arc<dyn Interceptor<P, T, E>>>,
}

// Folds a value through one stage of every interceptor. Expands inside the stage
// method, so `return` leaves that method.
macro_rules! run_stage {
    ($pipeline:expr, $stage:expr, $method:ident, $ctx:expr, $value:expr) => {{
        let mut current = $value;
        let mut replaced = false;
        for ic in &$pipeline.interceptors {
            match ic
                .$method($ctx, current)
                .await
                .map_err(|e| Error::interceptor($stage, e))?
            {
                Intercept::Continue(v) => current = v,
                Intercept::Replace(v) => {
                    current = v;
                    replaced = true;
                }
                Intercept::Suppress => {
                    tracing::debug!(stage = %$stage, hash = %$ctx.hash, "interceptor suppressed");
                    return Ok(Intercept::Suppress);
                }
            }
        }
        Ok(if replaced {
            Intercept::Replace(current)
        } else {
            Intercept::Continue(current)
        })
    }};
}

impl<P, T, E> InterceptorPipeline<P, T, E>
where
    P: Send + Sync + 'static,
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    pub fn with<I: Interceptor<P, T, E> + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn push(&mut self, interceptor: Arc<dyn Interceptor<P, T, E>>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub async fn cache(
        &self,
        ctx: &InterceptContext<P>,
        cache: Option<CacheRecord<T>>,
    ) -> Result<Intercept<Option<CacheRecord<T>>>> {
        run_stage!(self, InterceptStage::Cache, on_cache, ctx, cache)
    }

    pub async fn request(&self, ctx: &InterceptContext<P>, parameters: P) -> Result<Intercept<P>> {
        run_stage!(self, InterceptStage::Request, on_request, ctx, parameters)
    }

    pub async fn success(&self, ctx: &InterceptContext<P>, data: T) -> Result<Intercept<T>> {
        run_stage!(self, InterceptStage::Success, on_success, ctx, data)
    }

    pub async fn error(&self, ctx: &InterceptContext<P>, error: E) -> Result<Intercept<E>> {
        run_stage!(self, InterceptStage::Error, on_error, ctx, error)
    }

    pub async fn finally(
        &self,
        ctx: &InterceptContext<P>,
        settled: Settled<T, E>,
    ) -> Result<Intercept<Settled<T, E>>> {
        run_stage!(self, InterceptStage::Finally, on_finally, ctx, settled)
    }
}

impl<P, T, E> Default for InterceptorPipeline<P, T, E>
where
    P: Send + Sync + 'static,
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T, E> Clone for InterceptorPipeline<P, T, E>
where
    P: Send + Sync + 'static,
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}
