use std::fmt;

/// How a call ended, from the caller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    /// Handler resolved and hooks were published.
    Succeeded,
    /// Handler failed after the retry budget was spent.
    Failed,
    /// Suppressed by the blocking guard or a request interceptor. Nothing was dispatched.
    Blocked,
    /// A success or error interceptor suppressed notification.
    Ignored,
    /// A newer call took over before this one could publish.
    Superseded,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeStatus::Succeeded => "succeeded",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Blocked => "blocked",
            OutcomeStatus::Ignored => "ignored",
            OutcomeStatus::Superseded => "superseded",
        };
        f.write_str(s)
    }
}

/// Terminal result of one `run`.
///
/// `data` / `error` are the values after the finally stage, or the raw ones when
/// the call never reached it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T, E> {
    pub hash: String,
    pub status: OutcomeStatus,
    pub data: Option<T>,
    pub error: Option<E>,
}

impl<T, E> Outcome<T, E> {
    pub(crate) fn new(hash: &str, status: OutcomeStatus, data: Option<T>, error: Option<E>) -> Self {
        Self {
            hash: hash.to_string(),
            status,
            data,
            error,
        }
    }

    pub(crate) fn blocked(hash: &str) -> Self {
        Self::new(hash, OutcomeStatus::Blocked, None, None)
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }

    pub fn is_blocked(&self) -> bool {
        self.status == OutcomeStatus::Blocked
    }

    pub fn is_superseded(&self) -> bool {
        self.status == OutcomeStatus::Superseded
    }

    /// `Ok(data)` / `Err(error)` view. `None` when neither is present.
    pub fn into_result(self) -> Option<Result<T, E>> {
        match (self.data, self.error) {
            (_, Some(e)) => Some(Err(e)),
            (Some(d), None) => Some(Ok(d)),
            (None, None) => None,
        }
    }
}
