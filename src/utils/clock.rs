//! Wall-clock helpers. Lifecycle records and persisted cache records carry
//! epoch milliseconds so they stay comparable across process restarts.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Clocks set before 1970 read as zero.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Milliseconds elapsed since `since_ms`, saturating at zero for future stamps.
pub fn elapsed_ms(since_ms: u64) -> u64 {
    now_ms().saturating_sub(since_ms)
}

pub fn duration_ms(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_saturates_for_future_stamps() {
        assert_eq!(elapsed_ms(now_ms() + 60_000), 0);
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(Duration::from_secs(2)), 2_000);
    }
}
