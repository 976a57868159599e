//! Per-IP abuse heuristics.
//!
//! A coarser companion to the rate limiter: rather than one fixed window,
//! it accumulates a per-IP request count, the time of the last request, and
//! a suspicion counter. Three patterns deny a request:
//!
//! 1. a burst: many requests with under a second between them;
//! 2. sustained volume: a very high count inside a minute;
//! 3. a repeat offender: enough accumulated suspicion flags.
//!
//! Entries idle for a day are swept lazily. Like the rate limiter this is
//! injected state, per-process and best-effort; denials carry a reason
//! string meant for the suspicious-activity log.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Tuning knobs for the heuristics.
#[derive(Debug, Clone)]
pub struct IpTrackerConfig {
    /// Idle time after which an entry is forgotten.
    pub entry_ttl: Duration,
    /// Request count above which a sub-second gap counts as a burst.
    pub burst_threshold: u32,
    /// Maximum gap between requests for the burst check.
    pub burst_gap: Duration,
    /// Request count above which volume inside `sustained_window` denies.
    pub sustained_threshold: u32,
    /// Window for the sustained-volume check.
    pub sustained_window: Duration,
    /// Suspicion flags at which an IP is blocked outright.
    pub max_flags: u32,
}

impl Default for IpTrackerConfig {
    fn default() -> Self {
        Self {
            entry_ttl: Duration::from_secs(24 * 60 * 60),
            burst_threshold: 50,
            burst_gap: Duration::from_secs(1),
            sustained_threshold: 1000,
            sustained_window: Duration::from_secs(60),
            max_flags: 3,
        }
    }
}

/// Why an IP was denied. Every variant is worth recording in the
/// suspicious-activity log.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum IpRejection {
    /// Sub-second request gap after many prior requests.
    #[error("too many rapid requests")]
    RapidRequests,

    /// Very high request count inside the sustained window.
    #[error("excessive request frequency")]
    ExcessiveFrequency,

    /// The IP accumulated enough suspicion flags to be blocked.
    #[error("IP temporarily blocked due to suspicious activity")]
    Blocked,
}

#[derive(Debug, Clone, Copy)]
struct IpEntry {
    count: u32,
    last_activity: Instant,
    suspicious_flags: u32,
}

/// Sink for denied-request records (the observability side of the
/// heuristics). The server wires this to a persistent log table; tests use
/// [`NoopActivityLog`].
pub trait ActivityLog: Send + Sync {
    /// Records one suspicious event.
    fn record(&self, ip: &str, user_agent: &str, reason: &str, metadata: serde_json::Value);
}

/// An [`ActivityLog`] that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActivityLog;

impl ActivityLog for NoopActivityLog {
    fn record(&self, _ip: &str, _user_agent: &str, _reason: &str, _metadata: serde_json::Value) {}
}

/// Tracks per-IP request patterns and applies the heuristics.
#[derive(Debug, Default)]
pub struct IpTracker {
    config: IpTrackerConfig,
    state: RwLock<HashMap<String, IpEntry>>,
}

impl IpTracker {
    /// Creates a tracker with the given configuration.
    #[must_use]
    pub fn new(config: IpTrackerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Records one request from `ip` and applies the heuristics.
    ///
    /// # Errors
    ///
    /// An [`IpRejection`] naming the first heuristic that fired. Denials
    /// also bump the IP's suspicion counter.
    pub fn check(&self, ip: &str) -> Result<(), IpRejection> {
        self.check_at(ip, Instant::now())
    }

    /// [`Self::check`] with an explicit clock, for tests.
    pub fn check_at(&self, ip: &str, now: Instant) -> Result<(), IpRejection> {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        state.retain(|_, entry| now.duration_since(entry.last_activity) < self.config.entry_ttl);

        let entry = state.entry(ip.to_string()).or_insert(IpEntry {
            count: 0,
            last_activity: now,
            suspicious_flags: 0,
        });

        let gap = now.duration_since(entry.last_activity);

        if gap < self.config.burst_gap && entry.count > self.config.burst_threshold {
            entry.suspicious_flags += 1;
            tracing::warn!(ip = %ip, count = entry.count, "burst heuristic fired");
            return Err(IpRejection::RapidRequests);
        }

        if entry.count > self.config.sustained_threshold && gap < self.config.sustained_window {
            entry.suspicious_flags += 1;
            tracing::warn!(ip = %ip, count = entry.count, "sustained-volume heuristic fired");
            return Err(IpRejection::ExcessiveFrequency);
        }

        if entry.suspicious_flags >= self.config.max_flags {
            tracing::warn!(ip = %ip, flags = entry.suspicious_flags, "IP blocked");
            return Err(IpRejection::Blocked);
        }

        entry.count += 1;
        entry.last_activity = now;
        Ok(())
    }

    /// Seeds the given IPs with maximal suspicion so subsequent requests
    /// are denied. Stands in for a firewall/CDN integration.
    pub fn block_ips<I, S>(&self, ips: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let now = Instant::now();
        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for ip in ips {
            state.insert(
                ip.as_ref().to_string(),
                IpEntry {
                    count: 1000,
                    last_activity: now,
                    suspicious_flags: self.config.max_flags + 1,
                },
            );
        }
    }

    /// Number of currently tracked IPs, for monitoring.
    #[must_use]
    pub fn tracked_ips(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_traffic_passes() {
        let tracker = IpTracker::default();
        let start = Instant::now();
        for i in 0..10 {
            assert!(tracker
                .check_at("1.2.3.4", start + Duration::from_secs(i * 2))
                .is_ok());
        }
    }

    #[test]
    fn burst_after_threshold_denied() {
        let tracker = IpTracker::default();
        let start = Instant::now();
        // Build up past the burst threshold with comfortable spacing.
        for i in 0..60 {
            tracker
                .check_at("9.9.9.9", start + Duration::from_secs(i * 2))
                .unwrap();
        }
        let base = start + Duration::from_secs(120);
        tracker.check_at("9.9.9.9", base).unwrap();
        // Next request lands within the burst gap.
        let err = tracker
            .check_at("9.9.9.9", base + Duration::from_millis(100))
            .unwrap_err();
        assert_eq!(err, IpRejection::RapidRequests);
    }

    #[test]
    fn repeat_offender_gets_blocked() {
        let tracker = IpTracker::new(IpTrackerConfig {
            max_flags: 2,
            ..IpTrackerConfig::default()
        });
        tracker.block_ips(["6.6.6.6"]);
        // Past the burst and sustained windows only the flag count applies.
        let later = Instant::now() + Duration::from_secs(120);
        assert_eq!(
            tracker.check_at("6.6.6.6", later).unwrap_err(),
            IpRejection::Blocked
        );
    }

    #[test]
    fn blocked_ips_stay_blocked() {
        let tracker = IpTracker::default();
        tracker.block_ips(["7.7.7.7", "8.8.8.8"]);
        assert!(tracker.check("7.7.7.7").is_err());
        assert!(tracker.check("8.8.8.8").is_err());
        assert!(tracker.check("1.1.1.1").is_ok());
    }

    #[test]
    fn idle_entries_are_swept() {
        let tracker = IpTracker::new(IpTrackerConfig {
            entry_ttl: Duration::from_secs(10),
            ..IpTrackerConfig::default()
        });
        let start = Instant::now();
        tracker.check_at("1.1.1.1", start).unwrap();
        assert_eq!(tracker.tracked_ips(), 1);
        tracker
            .check_at("2.2.2.2", start + Duration::from_secs(11))
            .unwrap();
        assert_eq!(tracker.tracked_ips(), 1);
    }
}
