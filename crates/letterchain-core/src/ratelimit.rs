//! Fixed-window per-client rate limiter.
//!
//! Tracks one counter per client key (normally the resolved client IP) that
//! resets when its window elapses. Expired entries are swept lazily on each
//! call, and a hard cap bounds the number of tracked keys so spoofed
//! addresses cannot grow the map without limit.
//!
//! The limiter is a plain value injected into handler state, not a
//! module-level singleton, so multi-instance deployments can replace it
//! with a shared store. As built it is best-effort per-process only.
//!
//! # Thread safety
//!
//! State sits behind an `RwLock`; handlers may call `check` concurrently.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed per key within one window.
    pub max_requests: u32,

    /// Window length; the counter resets when it elapses.
    pub window: Duration,

    /// Hard cap on distinct tracked keys. When the map is full and an
    /// untracked key arrives after a sweep, the request is refused.
    pub max_tracked_keys: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window: Duration::from_secs(60),
            max_tracked_keys: 10_000,
        }
    }
}

/// Refusal detail for a limited request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    /// How long until the key's window resets.
    pub retry_after: Duration,
    /// The configured per-window limit, for response headers.
    pub limit: u32,
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window rate limiter keyed by client identifier.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: RwLock<HashMap<String, WindowEntry>>,
}

impl RateLimiter {
    /// Creates a limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Records one request for `key` and decides whether it is allowed.
    ///
    /// Sweeps expired entries first, then either opens a fresh window,
    /// increments the live one, or refuses with the time until reset.
    ///
    /// # Errors
    ///
    /// [`RateLimited`] when the key exhausted its window, or when the
    /// tracked-key cap is reached and `key` is new even after the sweep.
    pub fn check(&self, key: &str) -> Result<(), RateLimited> {
        self.check_at(key, Instant::now())
    }

    /// [`Self::check`] with an explicit clock, for tests.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimited> {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // Lazy sweep keeps memory bounded without a background task.
        state.retain(|_, entry| entry.reset_at > now);

        match state.get_mut(key) {
            Some(entry) => {
                if entry.count >= self.config.max_requests {
                    let limited = RateLimited {
                        retry_after: entry.reset_at.saturating_duration_since(now),
                        limit: self.config.max_requests,
                    };
                    tracing::warn!(
                        key = %key,
                        count = entry.count,
                        max = self.config.max_requests,
                        "rate limit exceeded"
                    );
                    return Err(limited);
                }
                entry.count += 1;
                Ok(())
            },
            None => {
                if state.len() >= self.config.max_tracked_keys {
                    tracing::warn!(
                        key = %key,
                        tracked = state.len(),
                        cap = self.config.max_tracked_keys,
                        "refusing new key: tracked-key cap reached"
                    );
                    return Err(RateLimited {
                        retry_after: self.config.window,
                        limit: self.config.max_requests,
                    });
                }
                state.insert(
                    key.to_string(),
                    WindowEntry {
                        count: 1,
                        reset_at: now + self.config.window,
                    },
                );
                Ok(())
            },
        }
    }

    /// Number of currently tracked keys, for monitoring.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            ..RateLimitConfig::default()
        })
    }

    #[test]
    fn allows_up_to_limit() {
        let limiter = limiter(3, 60);
        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4").is_ok());
        }
        assert!(limiter.check("1.2.3.4").is_err());
    }

    #[test]
    fn keys_are_tracked_separately() {
        let limiter = limiter(2, 60);
        assert!(limiter.check("1.1.1.1").is_ok());
        assert!(limiter.check("1.1.1.1").is_ok());
        assert!(limiter.check("1.1.1.1").is_err());
        assert!(limiter.check("2.2.2.2").is_ok());
    }

    #[test]
    fn window_reset_restores_quota() {
        let limiter = limiter(1, 60);
        let start = Instant::now();
        assert!(limiter.check_at("k", start).is_ok());
        assert!(limiter.check_at("k", start).is_err());
        // One second past the reset point the sweep drops the entry.
        assert!(limiter
            .check_at("k", start + Duration::from_secs(61))
            .is_ok());
    }

    #[test]
    fn retry_after_reports_time_to_reset() {
        let limiter = limiter(1, 60);
        let start = Instant::now();
        limiter.check_at("k", start).unwrap();
        let limited = limiter
            .check_at("k", start + Duration::from_secs(20))
            .unwrap_err();
        assert_eq!(limited.retry_after, Duration::from_secs(40));
        assert_eq!(limited.limit, 1);
    }

    #[test]
    fn sweep_drops_expired_entries() {
        let limiter = limiter(10, 1);
        let start = Instant::now();
        for i in 0..5 {
            limiter.check_at(&format!("10.0.0.{i}"), start).unwrap();
        }
        assert_eq!(limiter.tracked_keys(), 5);
        limiter
            .check_at("fresh", start + Duration::from_secs(2))
            .unwrap();
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn tracked_key_cap_refuses_new_keys() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 10,
            window: Duration::from_secs(60),
            max_tracked_keys: 3,
        });
        let start = Instant::now();
        for i in 0..3 {
            limiter.check_at(&format!("10.0.0.{i}"), start).unwrap();
        }
        assert!(limiter.check_at("10.0.0.99", start).is_err());
        // Existing keys keep working at the cap.
        assert!(limiter.check_at("10.0.0.0", start).is_ok());
    }

    #[test]
    fn concurrent_checks_respect_the_limit() {
        use std::sync::Arc;

        let limiter = Arc::new(limiter(100, 60));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        let _ = limiter.check("shared");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(limiter.check("shared").is_err());
    }
}
