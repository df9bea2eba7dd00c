//! Minimal prelude for application code.

pub use crate::cache::CacheConfig;
pub use crate::events::EventHandlers;
pub use crate::interceptors::{Intercept, InterceptContext, Interceptor};
pub use crate::registry::TaskRegistry;
pub use crate::request::{Outcome, OutcomeStatus, RequestFlags, TaskConfig};
pub use crate::task::{RequestOptions, TaskManager};
pub use crate::{Error, Result};
