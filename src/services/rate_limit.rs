//! Fixed-window request counters, one per policy.
//!
//! Counters are process-local in-memory state, constructed once in `main` and
//! carried in `AppState` so tests can build their own instances. A multi-node
//! deployment would need a shared counter backend instead; that swap happens
//! here without touching the handlers.

use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// How often the background sweeper evicts elapsed windows.
pub const SWEEP_INTERVAL_SECS: u64 = 60;

/// Outcome of a single `check` call.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub current: u32,
    pub limit: u32,
    pub reset_time: DateTime<Utc>,
}

impl RateLimitDecision {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.current)
    }

    /// Seconds until the window resets, rounded up, never negative.
    pub fn retry_after_secs(&self) -> u64 {
        let millis = (self.reset_time - Utc::now()).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            ((millis + 999) / 1000) as u64
        }
    }
}

struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Fixed-window counter keyed by an arbitrary string (API key, user id, IP).
pub struct RateLimiter {
    max: u32,
    window: Duration,
    counters: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request against `key` and decide whether it is allowed.
    ///
    /// The counter resets to 1 on the first request for a key or once the
    /// window has elapsed; otherwise it increments. Denied requests are still
    /// counted but persist no other state.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = Utc::now();
        let mut counters = self.counters.lock();
        let entry = counters.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now - entry.started_at >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }
        entry.count += 1;

        RateLimitDecision {
            allowed: entry.count <= self.max,
            current: entry.count,
            limit: self.max,
            reset_time: entry.started_at + self.window,
        }
    }

    /// Drop every key whose window has already elapsed. Returns the number of
    /// evicted entries. Keeps memory bounded even for one-shot keys that never
    /// come back.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut counters = self.counters.lock();
        let before = counters.len();
        counters.retain(|_, w| now - w.started_at < self.window);
        before - counters.len()
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.counters.lock().len()
    }
}

/// The four policies the platform runs with.
pub struct RateLimiters {
    /// Ingestion endpoint, keyed by X-API-Key.
    pub ingestion: RateLimiter,
    /// Sensitive financial operations (payout exceptions), keyed by user.
    pub financial: RateLimiter,
    /// General authenticated traffic, keyed by user.
    pub general: RateLimiter,
    /// Lead status updates, keyed by user.
    pub status_update: RateLimiter,
}

impl RateLimiters {
    pub fn new() -> Self {
        Self {
            ingestion: RateLimiter::new(10, Duration::minutes(1)),
            financial: RateLimiter::new(10, Duration::hours(1)),
            general: RateLimiter::new(100, Duration::minutes(15)),
            status_update: RateLimiter::new(30, Duration::minutes(1)),
        }
    }

    pub fn sweep_all(&self) -> usize {
        self.ingestion.sweep()
            + self.financial.sweep()
            + self.general.sweep()
            + self.status_update.sweep()
    }
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::new()
    }
}

/// X-RateLimit-* headers, attached to every response on a rate-limited route,
/// allowed or not.
pub fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert(
        "x-ratelimit-remaining",
        HeaderValue::from(decision.remaining()),
    );
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_time.timestamp()),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_denies() {
        let limiter = RateLimiter::new(3, Duration::minutes(1));

        for i in 1..=3 {
            let d = limiter.check("key-a");
            assert!(d.allowed, "request {} should be allowed", i);
            assert_eq!(d.current, i);
        }

        let denied = limiter.check("key-a");
        assert!(!denied.allowed);
        assert_eq!(denied.current, 4);
        assert_eq!(denied.remaining(), 0);
        assert!(denied.retry_after_secs() <= 60);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::minutes(1));
        assert!(limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
        assert!(!limiter.check("a").allowed);
    }

    #[test]
    fn window_elapse_resets_counter_to_one() {
        let limiter = RateLimiter::new(2, Duration::milliseconds(40));
        limiter.check("k");
        limiter.check("k");
        assert!(!limiter.check("k").allowed);

        std::thread::sleep(std::time::Duration::from_millis(60));

        let d = limiter.check("k");
        assert!(d.allowed);
        assert_eq!(d.current, 1);
    }

    #[test]
    fn sweep_evicts_only_elapsed_windows() {
        let limiter = RateLimiter::new(5, Duration::milliseconds(40));
        limiter.check("stale");
        std::thread::sleep(std::time::Duration::from_millis(60));
        limiter.check("fresh");

        let evicted = limiter.sweep();
        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn headers_carry_limit_remaining_and_reset() {
        let limiter = RateLimiter::new(10, Duration::minutes(1));
        let d = limiter.check("k");
        let headers = rate_limit_headers(&d);

        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "10");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "9");
        assert!(headers.contains_key("x-ratelimit-reset"));
    }

    #[test]
    fn retry_after_rounds_partial_seconds_up() {
        let mid_window = RateLimitDecision {
            allowed: false,
            current: 2,
            limit: 1,
            reset_time: Utc::now() + Duration::milliseconds(2500),
        };
        assert_eq!(mid_window.retry_after_secs(), 3);

        let elapsed = RateLimitDecision {
            allowed: false,
            current: 2,
            limit: 1,
            reset_time: Utc::now() - Duration::seconds(5),
        };
        assert_eq!(elapsed.retry_after_secs(), 0);
    }

    #[test]
    fn denied_check_still_reports_reset_time_in_future() {
        let limiter = RateLimiter::new(1, Duration::minutes(1));
        limiter.check("k");
        let d = limiter.check("k");
        assert!(!d.allowed);
        assert!(d.reset_time > Utc::now());
    }
}
