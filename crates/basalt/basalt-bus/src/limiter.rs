//! Token-window rate limiting for the publish path.

use basalt_ring::clock;

/// Fixed-window limiter: `rate_hz` publishes per one-second window.
///
/// The contract is advisory — `should_defer` returning true means
/// "defer this publish"; the caller decides whether that is a drop or a
/// backoff-and-retry.
pub struct TokenWindow {
    quota: u64,
    window_ns: u64,
    window_start_ns: u64,
    in_window: u64,
    throttled: u64,
}

const WINDOW_NS: u64 = 1_000_000_000;

impl TokenWindow {
    pub fn new(rate_hz: u64) -> Self {
        Self {
            quota: rate_hz,
            window_ns: WINDOW_NS,
            window_start_ns: 0,
            in_window: 0,
            throttled: 0,
        }
    }

    /// True when this publish should be deferred; otherwise a token is
    /// consumed.
    #[inline]
    pub fn should_defer(&mut self) -> bool {
        self.defer_at(clock::now_ns())
    }

    /// Total deferrals since creation.
    pub fn throttled(&self) -> u64 {
        self.throttled
    }

    fn defer_at(&mut self, now_ns: u64) -> bool {
        if now_ns.saturating_sub(self.window_start_ns) >= self.window_ns {
            self.window_start_ns = now_ns;
            self.in_window = 0;
        }
        if self.in_window >= self.quota {
            self.throttled += 1;
            return true;
        }
        self.in_window += 1;
        false
    }
}
