//! Per-key, per-route request rate limiting.
//!
//! Counting is windowed: each (key, route) pair gets a counter that resets
//! when its window elapses. Hitting the ceiling is expected traffic shaping,
//! surfaced with the seconds remaining until the window resets and logged at
//! debug only.

use crate::clock::SharedClock;
use crate::config::RouteLimit;
use crate::error::GateError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Windowed request counter shared by every route gate.
pub struct RateLimiter {
    clock: SharedClock,
    windows: Mutex<HashMap<(String, String), Window>>,
}

impl RateLimiter {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one request for `key` (commonly the client address)
    /// on `route` under the route's declared limit.
    pub fn allow(&self, key: &str, route: &str, limit: RouteLimit) -> Result<(), GateError> {
        let now = self.clock.now();
        let window = chrono::Duration::seconds(limit.window_secs as i64);

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let state = windows
            .entry((key.to_string(), route.to_string()))
            .or_insert(Window {
                started_at: now,
                count: 0,
            });

        if now >= state.started_at + window {
            state.started_at = now;
            state.count = 0;
        }

        if state.count >= limit.max_requests {
            let remaining_ms = (state.started_at + window - now).num_milliseconds();
            let retry_after_secs = ((remaining_ms.max(0) as u64) + 999) / 1000;
            let retry_after_secs = retry_after_secs.max(1);

            debug!(
                key = %key,
                route = %route,
                retry_after_secs,
                "rate limit reached"
            );
            return Err(GateError::RateLimited { retry_after_secs });
        }

        state.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn limiter() -> (RateLimiter, std::sync::Arc<ManualClock>) {
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        (RateLimiter::new(clock.clone()), clock)
    }

    #[test]
    fn test_sixth_call_rejected_with_retry_after() {
        let (limiter, _clock) = limiter();
        let limit = RouteLimit::new(5, 60);

        for _ in 0..5 {
            assert!(limiter.allow("k", "login", limit).is_ok());
        }

        match limiter.allow("k", "login", limit) {
            Err(GateError::RateLimited { retry_after_secs }) => {
                assert!(retry_after_secs > 0);
                assert!(retry_after_secs <= 60);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_window_reset_allows_again() {
        let (limiter, clock) = limiter();
        let limit = RouteLimit::new(5, 60);

        for _ in 0..5 {
            limiter.allow("k", "login", limit).unwrap();
        }
        assert!(limiter.allow("k", "login", limit).is_err());

        clock.advance(chrono::Duration::seconds(60));
        assert!(limiter.allow("k", "login", limit).is_ok());
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _clock) = limiter();
        let limit = RouteLimit::new(1, 60);

        limiter.allow("10.0.0.1", "detect", limit).unwrap();
        assert!(limiter.allow("10.0.0.1", "detect", limit).is_err());
        assert!(limiter.allow("10.0.0.2", "detect", limit).is_ok());
    }

    #[test]
    fn test_routes_are_independent() {
        let (limiter, _clock) = limiter();
        let limit = RouteLimit::new(1, 60);

        limiter.allow("k", "login", limit).unwrap();
        assert!(limiter.allow("k", "login", limit).is_err());
        assert!(limiter.allow("k", "detect", limit).is_ok());
    }

    #[test]
    fn test_retry_after_shrinks_as_window_ages() {
        let (limiter, clock) = limiter();
        let limit = RouteLimit::new(1, 60);

        limiter.allow("k", "login", limit).unwrap();
        clock.advance(chrono::Duration::seconds(45));

        match limiter.allow("k", "login", limit) {
            Err(GateError::RateLimited { retry_after_secs }) => {
                assert_eq!(retry_after_secs, 15);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }
}
