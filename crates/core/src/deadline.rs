//! Deadline arithmetic for configured timeouts.

use std::time::Duration;
use tokio::time::Instant;

/// Roughly 30 years, the same horizon tokio uses for "never".
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + timeout`, saturating to a far-future instant instead of
/// overflowing when `timeout` is effectively unbounded.
pub fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_timeouts_add_exactly() {
        let start = Instant::now();
        assert_eq!(
            deadline_after(start, Duration::from_secs(30)),
            start + Duration::from_secs(30)
        );
    }

    #[test]
    fn huge_timeouts_saturate() {
        let start = Instant::now();
        let deadline = deadline_after(start, Duration::from_secs(u64::MAX));
        assert!(deadline >= start + Duration::from_secs(86_400 * 365));

        let deadline = deadline_after(start, Duration::from_secs(i64::MAX as u64));
        assert!(deadline > start);
    }
}
