//! Admission checks that run before a request reaches a channel.
//!
//! Two independent layers, checked in order:
//! 1. `AccessList` -- user id allow-list (empty list admits everyone)
//! 2. `RateLimiter` -- fixed-window request counter per user
//!
//! A rejected request never touches channel state.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use palaver_types::config::{AccessConfig, RateLimitConfig};

/// Reply sent to users outside the allow-list.
pub const DENIAL_MESSAGE: &str = "Sorry, you are not authorized to use this bot.";

/// User id allow-list.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    allowed: HashSet<String>,
}

impl AccessList {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.allowed_users.iter().cloned())
    }

    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn allows(&self, user_id: &str) -> bool {
        self.is_open() || self.allowed.contains(user_id)
    }
}

/// Request counter for one user.
struct WindowCounter {
    count: u32,
    window_start: Instant,
}

/// Fixed-window per-user rate limiter.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    counters: DashMap<String, WindowCounter>,
    last_prune: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            counters: DashMap::new(),
            last_prune: Mutex::new(Instant::now()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    /// Count a request from `user_id`.
    ///
    /// Returns `Err(retry_after)` once the user has used up the window; a
    /// rejected request does not count.
    pub fn check(&self, user_id: &str) -> Result<(), Duration> {
        let mut entry = self
            .counters
            .entry(user_id.to_string())
            .or_insert_with(|| WindowCounter {
                count: 0,
                window_start: Instant::now(),
            });
        let counter = entry.value_mut();

        let elapsed = counter.window_start.elapsed();
        if elapsed >= self.window {
            counter.count = 0;
            counter.window_start = Instant::now();
        } else if counter.count >= self.max_requests {
            return Err(self.window - elapsed);
        }

        counter.count += 1;
        Ok(())
    }

    /// Drop counters whose window has expired.
    pub fn prune(&self) -> usize {
        let before = self.counters.len();
        self.counters
            .retain(|_, counter| counter.window_start.elapsed() < self.window);
        before - self.counters.len()
    }

    /// Prune at most once per window. Returns how many counters were dropped.
    pub fn prune_if_due(&self) -> usize {
        {
            let mut last = self.last_prune.lock().unwrap_or_else(PoisonError::into_inner);
            if last.elapsed() < self.window {
                return 0;
            }
            *last = Instant::now();
        }
        self.prune()
    }

    pub fn tracked_users(&self) -> usize {
        self.counters.len()
    }

    /// User-facing rejection text, rounded up to whole seconds.
    pub fn retry_message(retry_after: Duration) -> String {
        let mut secs = retry_after.as_secs();
        if retry_after.subsec_nanos() > 0 || secs == 0 {
            secs += 1;
        }
        format!("Rate limit reached, please retry after {secs} seconds.")
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_access_list_admits_everyone() {
        let access = AccessList::default();
        assert!(access.is_open());
        assert!(access.allows("anyone"));
    }

    #[test]
    fn test_access_list_rejects_strangers() {
        let access = AccessList::from_config(&AccessConfig {
            allowed_users: vec!["u1".to_string()],
        });
        assert!(access.allows("u1"));
        assert!(!access.allows("u2"));
    }

    #[test]
    fn test_rate_limit_blocks_after_max() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check("u1").is_ok());
        }
        let retry = limiter.check("u1").unwrap_err();
        assert!(retry <= Duration::from_secs(60));
        assert!(retry > Duration::from_secs(50));

        // Other users have their own window.
        assert!(limiter.check("u2").is_ok());
    }

    #[test]
    fn test_window_expiry_resets_count() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check("u1").is_ok());
        assert!(limiter.check("u1").is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check("u1").is_ok());
    }

    #[test]
    fn test_prune_drops_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_millis(20));
        limiter.check("u1").unwrap();
        limiter.check("u2").unwrap();
        assert_eq!(limiter.prune(), 0);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(limiter.prune(), 2);
        assert_eq!(limiter.tracked_users(), 0);
    }

    #[test]
    fn test_prune_if_due_waits_for_a_window() {
        let limiter = RateLimiter::new(5, Duration::from_millis(20));
        limiter.check("u1").unwrap();
        assert_eq!(limiter.prune_if_due(), 0);
        assert_eq!(limiter.tracked_users(), 1);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(limiter.prune_if_due(), 1);
        assert_eq!(limiter.tracked_users(), 0);
    }

    #[test]
    fn test_retry_message_rounds_up() {
        assert_eq!(
            RateLimiter::retry_message(Duration::from_millis(41_200)),
            "Rate limit reached, please retry after 42 seconds."
        );
        assert_eq!(
            RateLimiter::retry_message(Duration::from_secs(5)),
            "Rate limit reached, please retry after 5 seconds."
        );
    }
}
