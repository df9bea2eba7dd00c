//! Lifecycle record of the active call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase entered by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Requested,
    Began,
    Succeed,
    Cached,
    Blocked,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Requested => "requested",
            RequestStatus::Began => "began",
            RequestStatus::Succeed => "succeed",
            RequestStatus::Cached => "cached",
            RequestStatus::Blocked => "blocked",
            RequestStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Succeed | RequestStatus::Blocked | RequestStatus::Failed
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-slot register describing the most recent call.
///
/// `hash` names the only call allowed to publish transitions; everything else is
/// stale. The record is replaced wholesale when a call starts or on reset, and
/// otherwise changes only through [`RequestDetails::enter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails<P> {
    pub parameters: Option<P>,
    pub hash: Option<String>,
    /// Epoch milliseconds.
    pub created_at: Option<u64>,
    /// Epoch milliseconds of the last transition.
    pub updated_at: Option<u64>,
    pub is_requested: bool,
    pub is_succeed: bool,
    pub is_cached: bool,
    pub is_blocked: bool,
    pub is_failed: bool,
    pub status: Option<RequestStatus>,
    /// Every phase entered, in order.
    pub procedure: Vec<RequestStatus>,
}

impl<P> Default for RequestDetails<P> {
    fn default() -> Self {
        Self {
            parameters: None,
            hash: None,
            created_at: None,
            updated_at: None,
            is_requested: false,
            is_succeed: false,
            is_cached: false,
            is_blocked: false,
            is_failed: false,
            status: None,
            procedure: Vec::new(),
        }
    }
}

impl<P> RequestDetails<P> {
    /// Fresh record for a call that was just accepted.
    pub fn requested(parameters: P, hash: impl Into<String>, now: u64) -> Self {
        Self {
            parameters: Some(parameters),
            hash: Some(hash.into()),
            created_at: Some(now),
            updated_at: Some(now),
            is_requested: true,
            status: Some(RequestStatus::Requested),
            procedure: vec![RequestStatus::Requested],
            ..Self::default()
        }
    }

    /// Record a transition: set the matching flag, stamp `updated_at`, append to `procedure`.
    pub fn enter(&mut self, status: RequestStatus, now: u64) {
        match status {
            RequestStatus::Requested | RequestStatus::Began => self.is_requested = true,
            RequestStatus::Succeed => self.is_succeed = true,
            RequestStatus::Cached => self.is_cached = true,
            RequestStatus::Blocked => self.is_blocked = true,
            RequestStatus::Failed => self.is_failed = true,
        }
        self.status = Some(status);
        self.updated_at = Some(now);
        self.procedure.push(status);
    }

    pub fn is_same_request(&self, hash: &str) -> bool {
        self.hash.as_deref() == Some(hash)
    }

    pub fn is_empty(&self) -> bool {
        self.created_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let d: RequestDetails<u8> = RequestDetails::default();
        assert!(d.is_empty());
        assert!(d.procedure.is_empty());
        assert!(!d.is_same_request("x"));
    }

    #[test]
    fn test_enter_appends_procedure() {
        let mut d = RequestDetails::requested(1u8, "h", 10);
        d.enter(RequestStatus::Began, 11);
        d.enter(RequestStatus::Cached, 12);
        d.enter(RequestStatus::Succeed, 13);
        assert_eq!(
            d.procedure,
            vec![
                RequestStatus::Requested,
                RequestStatus::Began,
                RequestStatus::Cached,
                RequestStatus::Succeed
            ]
        );
        assert!(d.is_cached && d.is_succeed && !d.is_failed);
        assert_eq!(d.created_at, Some(10));
        assert_eq!(d.updated_at, Some(13));
        assert_eq!(d.status, Some(RequestStatus::Succeed));
    }

    #[test]
    fn test_serializes_camel_case() {
        let d = RequestDetails::requested(vec![1u8], "h", 5);
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["createdAt"], 5);
        assert_eq!(v["isRequested"], true);
        assert_eq!(v["status"], "requested");
        assert_eq!(v["procedure"][0], "requested");
    }
}
