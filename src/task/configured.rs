use super::manager::TaskManager;
use crate::events::EventHandlers;
use crate::request::{Outcome, RequestFlags};
use crate::types::{TaskData, TaskFailure, TaskParams};
use crate::Result;

/// Per-call overrides: hooks that fire before the instance defaults, plus flags.
pub struct RequestOptions<P, T, E> {
    pub(crate) flags: RequestFlags,
    pub(crate) handlers: EventHandlers<P, T, E>,
}

impl<P, T, E> RequestOptions<P, T, E> {
    pub fn new() -> Self {
        Self {
            flags: RequestFlags::default(),
            handlers: EventHandlers::new(),
        }
    }

    pub fn invalidate(mut self, on: bool) -> Self {
        self.flags.is_invalidate = on;
        self
    }

    pub fn pre_process(mut self, on: bool) -> Self {
        self.flags.is_pre_process = on;
        self
    }

    pub fn with_flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_handlers(mut self, handlers: EventHandlers<P, T, E>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn flags(&self) -> RequestFlags {
        self.flags
    }
}

impl<P, T, E> Default for RequestOptions<P, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T, E> From<EventHandlers<P, T, E>> for RequestOptions<P, T, E> {
    fn from(handlers: EventHandlers<P, T, E>) -> Self {
        Self::new().with_handlers(handlers)
    }
}

/// Request function bound to validated [`RequestOptions`].
pub struct ConfiguredRequest<'a, P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    manager: &'a TaskManager<P, T, E>,
    flags: RequestFlags,
    handlers: EventHandlers<P, T, E>,
}

impl<'a, P, T, E> ConfiguredRequest<'a, P, T, E>
where
    P: TaskParams,
    T: TaskData,
    E: TaskFailure,
{
    pub(crate) fn new(manager: &'a TaskManager<P, T, E>, options: RequestOptions<P, T, E>) -> Self {
        let handlers = if options.flags.is_invalidate {
            options.handlers.without_cache()
        } else {
            options.handlers
        };
        Self {
            manager,
            flags: options.flags,
            handlers,
        }
    }

    /// Run a call with the bound options. Zeroes the retry counter first, unless
    /// pre-processing; may be called any number of times.
    pub async fn request(&self, parameters: P) -> Result<Outcome<T, E>> {
        let core = self.manager.core();
        if !self.flags.is_pre_process {
            core.reset_retries();
        }
        core.run(parameters, self.flags, self.handlers.clone()).await
    }
}
