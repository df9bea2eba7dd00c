//! 请求生命周期编排：阻塞窗口、缓存查询、重试、拦截器与过期调用抑制。
//!
//! # Request Lifecycle
//!
//! ```text
//! (initial) -> requested -> began -> succeed*
//!                                \-> failed* -> [retry] -> requested (bounded)
//! requested -> blocked*          (blocking guard or request interceptor)
//! requested -> cached            (informational, may precede succeed)
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RequestCore`] | The orchestrator; owns [`RequestDetails`] and the retry counter |
//! | [`TaskConfig`] | Handler, retry policy, blocking window, cache, hooks, interceptors |
//! | [`TaskOptions`] | Serde-loadable subset of the configuration |
//! | [`RequestFlags`] | `is_invalidate` / `is_pre_process` |
//! | [`Outcome`] | Terminal result of one call |

mod config;
mod core;
mod details;
mod flags;
mod options;
mod outcome;

pub use self::config::{Handler, TaskConfig};
pub use self::core::RequestCore;
pub use self::details::{RequestDetails, RequestStatus};
pub use self::flags::RequestFlags;
pub use self::options::{CacheOptions, TaskOptions};
pub use self::outcome::{Outcome, OutcomeStatus};
