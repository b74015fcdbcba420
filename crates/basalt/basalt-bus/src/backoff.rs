//! Sleep intervals for blocking sends.

use std::time::Duration;

/// First backoff step.
const BASE_NS: u64 = 1_000;

/// Backoff ceiling; a blocked sender never sleeps longer than this in
/// one step.
const MAX_NS: u64 = 1_000_000;

/// Doubling backoff: 1 µs, 2 µs, 4 µs, ... capped at 1 ms.
pub fn exponential(attempt: u32) -> Duration {
    let shift = attempt.min(10);
    Duration::from_nanos((BASE_NS << shift).min(MAX_NS))
}

/// Backoff proportional to how far a reader trails, capped at 1 ms.
pub fn linear(lag: u64, max_lag: u64) -> Duration {
    if max_lag == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(MAX_NS * lag.min(max_lag) / max_lag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_doubles_and_caps() {
        assert_eq!(exponential(0), Duration::from_nanos(1_000));
        assert_eq!(exponential(1), Duration::from_nanos(2_000));
        assert_eq!(exponential(5), Duration::from_nanos(32_000));
        assert_eq!(exponential(10), Duration::from_millis(1));
        assert_eq!(exponential(u32::MAX), Duration::from_millis(1));
    }

    #[test]
    fn linear_scales_with_lag() {
        assert_eq!(linear(0, 100), Duration::ZERO);
        assert_eq!(linear(50, 100), Duration::from_nanos(500_000));
        assert_eq!(linear(100, 100), Duration::from_millis(1));
        assert_eq!(linear(1_000, 100), Duration::from_millis(1));
        assert_eq!(linear(10, 0), Duration::ZERO);
    }
}
