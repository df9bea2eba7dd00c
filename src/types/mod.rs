//! 核心类型约束：参数、结果与错误的标记 trait。
//!
//! Marker traits naming the bounds the orchestrator needs from the caller's types.
//! They are blanket-implemented, so any type meeting the bounds qualifies.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Parameter list of a call. Tuples serialize as JSON arrays and are fingerprinted
/// as an argument list; `()` stands for "no parameters".
pub trait TaskParams: Clone + Serialize + Send + Sync + 'static {}
impl<P> TaskParams for P where P: Clone + Serialize + Send + Sync + 'static {}

/// Successful handler result. Must round-trip through the persistent cache.
pub trait TaskData: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T> TaskData for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Handler failure value.
pub trait TaskFailure: Clone + Debug + Send + Sync + 'static {}
impl<E> TaskFailure for E where E: Clone + Debug + Send + Sync + 'static {}
