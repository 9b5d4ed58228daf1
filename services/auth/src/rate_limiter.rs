//! Sign-in throttling per login handle and client address

use std::collections::HashMap;
use std::env;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Failed attempts tolerated inside one window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,
            ban_duration_seconds: 3600,
        }
    }
}

impl RateLimiterConfig {
    /// Read `LOGIN_MAX_ATTEMPTS`, `LOGIN_WINDOW_SECONDS` and
    /// `LOGIN_BAN_SECONDS`. Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        fn read<T: std::str::FromStr>(key: &str, fallback: T) -> T {
            match env::var(key) {
                Ok(raw) => raw.parse().unwrap_or_else(|_| {
                    warn!("Ignoring unparsable {}={}", key, raw);
                    fallback
                }),
                Err(_) => fallback,
            }
        }

        Self {
            max_attempts: read("LOGIN_MAX_ATTEMPTS", defaults.max_attempts),
            window_seconds: read("LOGIN_WINDOW_SECONDS", defaults.window_seconds),
            ban_duration_seconds: read("LOGIN_BAN_SECONDS", defaults.ban_duration_seconds),
        }
    }
}

#[derive(Debug)]
struct Failures {
    count: u32,
    first_failure: Instant,
    banned_until: Option<Instant>,
}

impl Failures {
    /// Neither banned nor inside an open window, so it no longer counts
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        match self.banned_until {
            Some(until) => now >= until,
            None => now.duration_since(self.first_failure) >= window,
        }
    }
}

/// Limiter key for a sign-in attempt. Failures from one client address never
/// ban the same handle for other addresses.
pub fn login_key(name: &str, client: Option<IpAddr>) -> String {
    match client {
        Some(ip) => format!("{}@{}", name, ip),
        None => format!("{}@unknown", name),
    }
}

/// Counts failed sign-ins per key and bans keys that fail too often
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, Failures>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }

    /// Whether a sign-in attempt for `key` may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let Some(entry) = entries.get(key) else {
            return true;
        };

        if entry.is_stale(now, self.window()) {
            entries.remove(key);
            return true;
        }
        entry.banned_until.is_none()
    }

    /// Record a failed attempt, banning the key once the limit is reached
    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = self.window();

        entries.retain(|_, entry| !entry.is_stale(now, window));

        let entry = entries.entry(key.to_string()).or_insert(Failures {
            count: 0,
            first_failure: now,
            banned_until: None,
        });

        if now.duration_since(entry.first_failure) >= window {
            entry.count = 0;
            entry.first_failure = now;
        }

        entry.count += 1;
        if entry.count >= self.config.max_attempts {
            entry.banned_until = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            info!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
        }
    }

    /// Forget every failure recorded for `key`
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Drop keys whose window has closed and whose ban, if any, has run out
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        let window = self.window();
        self.entries
            .lock()
            .await
            .retain(|_, entry| !entry.is_stale(now, window));
    }

    /// Number of keys currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn limiter(max_attempts: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds: 300,
            ban_duration_seconds: 3600,
        })
    }

    #[tokio::test]
    async fn test_bans_after_max_failures() {
        let limiter = limiter(3);

        for _ in 0..2 {
            limiter.record_failure("alice").await;
            assert!(limiter.is_allowed("alice").await);
        }
        limiter.record_failure("alice").await;
        assert!(!limiter.is_allowed("alice").await);
        assert!(limiter.is_allowed("bob").await);
    }

    #[tokio::test]
    async fn test_reset_lifts_ban() {
        let limiter = limiter(1);
        limiter.record_failure("alice").await;
        assert!(!limiter.is_allowed("alice").await);

        limiter.reset("alice").await;
        assert!(limiter.is_allowed("alice").await);
    }

    #[tokio::test]
    async fn test_expired_ban_is_lifted() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_attempts: 1,
            window_seconds: 300,
            ban_duration_seconds: 0,
        });
        limiter.record_failure("alice").await;
        assert!(limiter.is_allowed("alice").await);
    }

    #[tokio::test]
    async fn test_closed_windows_are_forgotten() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_attempts: 5,
            window_seconds: 0,
            ban_duration_seconds: 0,
        });

        for i in 0..1000 {
            limiter.record_failure(&format!("name-{}", i)).await;
        }
        assert!(limiter.tracked_keys().await <= 1);

        limiter.purge_expired().await;
        assert_eq!(limiter.tracked_keys().await, 0);

        limiter.record_failure("alice").await;
        assert!(limiter.is_allowed("alice").await);
        assert_eq!(limiter.tracked_keys().await, 0);
    }

    #[tokio::test]
    async fn test_open_windows_and_bans_are_kept() {
        let limiter = limiter(2);
        limiter.record_failure("alice").await;
        limiter.record_failure("bob").await;
        limiter.record_failure("bob").await;

        limiter.purge_expired().await;
        assert_eq!(limiter.tracked_keys().await, 2);
        assert!(limiter.is_allowed("alice").await);
        assert!(!limiter.is_allowed("bob").await);
    }

    #[tokio::test]
    async fn test_ban_is_scoped_to_client_address() {
        let limiter = limiter(2);
        let attacker: IpAddr = "203.0.113.9".parse().unwrap();
        let office: IpAddr = "198.51.100.4".parse().unwrap();

        for _ in 0..5 {
            limiter.record_failure(&login_key("alice", Some(attacker))).await;
        }
        assert!(!limiter.is_allowed(&login_key("alice", Some(attacker))).await);
        assert!(limiter.is_allowed(&login_key("alice", Some(office))).await);
        assert!(limiter.is_allowed(&login_key("alice", None)).await);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        unsafe {
            env::set_var("LOGIN_MAX_ATTEMPTS", "7");
            env::set_var("LOGIN_WINDOW_SECONDS", "not-a-number");
            env::remove_var("LOGIN_BAN_SECONDS");
        }

        let config = RateLimiterConfig::from_env();
        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.window_seconds, 300);
        assert_eq!(config.ban_duration_seconds, 3600);

        unsafe {
            env::remove_var("LOGIN_MAX_ATTEMPTS");
            env::remove_var("LOGIN_WINDOW_SECONDS");
        }
    }
}
