//! Persisted cache record layout.

use serde::{Deserialize, Serialize};

/// `{ "data": <handler result>, "updatedAt": <epoch ms> }`, stored under the call's fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord<T> {
    pub data: T,
    pub updated_at: u64,
}

impl<T> CacheRecord<T> {
    pub fn new(data: T, updated_at: u64) -> Self {
        Self { data, updated_at }
    }

    /// Stamp `data` with the current time.
    pub fn now(data: T) -> Self {
        Self::new(data, crate::utils::clock::now_ms())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheRecord<U> {
        CacheRecord {
            data: f(self.data),
            updated_at: self.updated_at,
        }
    }
}
