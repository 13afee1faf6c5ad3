//! Per-client rate limiting over fixed windows
//!
//! A [`RateLimiter`] holds the policy (budget, window, rejection message)
//! and delegates counting to a [`CounterStore`]. The memory store keeps
//! counters in this process; the Redis store shares them between instances.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::cache::RedisPool;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// Entries beyond this count trigger a sweep of expired windows, at most once
/// per window length.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("counter store error: {0}")]
    Store(#[from] common::error::CacheError),
}

/// Counter state after recording a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Hits in the current window, this one included
    pub count: u64,
    /// Time until the window closes
    pub reset_after: Duration,
}

/// Storage for windowed hit counters
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record a hit for `key`, opening a new window of length `window` when
    /// none is active.
    async fn increment(&self, key: &str, window: Duration) -> Result<Hit, RateLimitError>;
}

/// Rate limiter entry
#[derive(Debug)]
struct WindowEntry {
    count: u64,
    started: Instant,
}

#[derive(Debug, Default)]
struct Counters {
    entries: HashMap<String, WindowEntry>,
    last_sweep: Option<Instant>,
}

impl Counters {
    fn sweep_if_due(&mut self, now: Instant, window: Duration) {
        if self.entries.len() <= SWEEP_THRESHOLD {
            return;
        }
        if self
            .last_sweep
            .is_some_and(|swept| now.duration_since(swept) < window)
        {
            return;
        }

        self.entries
            .retain(|_, entry| now.duration_since(entry.started) < window);
        self.last_sweep = Some(now);
    }
}

/// Process-local counters
///
/// Time comes from `tokio::time`, so a paused test runtime controls it.
#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    counters: Arc<Mutex<Counters>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.counters.lock().await.entries.len()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<Hit, RateLimitError> {
        let mut counters = self.counters.lock().await;
        let now = Instant::now();

        counters.sweep_if_due(now, window);

        let entry = counters.entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            started: now,
        });

        // Window expired, start a new one
        if now.duration_since(entry.started) >= window {
            entry.count = 0;
            entry.started = now;
        }

        entry.count += 1;

        Ok(Hit {
            count: entry.count,
            reset_after: window.saturating_sub(now.duration_since(entry.started)),
        })
    }
}

/// Counters shared through Redis
#[derive(Clone)]
pub struct RedisCounterStore {
    redis_pool: RedisPool,
}

impl RedisCounterStore {
    pub fn new(redis_pool: RedisPool) -> Self {
        Self { redis_pool }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<Hit, RateLimitError> {
        let counted = self
            .redis_pool
            .increment_window(&format!("ratelimit:{key}"), window)
            .await?;

        Ok(Hit {
            count: counted.count,
            reset_after: counted.remaining,
        })
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Prefix separating this limiter's counters from others in the same store
    pub name: &'static str,
    /// Maximum number of requests allowed per window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
    /// Message sent back with a rejection
    pub message: &'static str,
}

impl RateLimiterConfig {
    /// Strict budget for registration and login
    pub fn auth(max_requests: u32, window: Duration) -> Self {
        Self {
            name: "auth",
            max_requests,
            window,
            message: "Too many attempts, please try again later.",
        }
    }

    /// Lenient budget for the rest of the API
    pub fn api(max_requests: u32, window: Duration) -> Self {
        Self {
            name: "api",
            max_requests,
            window,
            message: "Too many requests, please try again later.",
        }
    }
}

/// Verdict for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig, store: Arc<dyn CounterStore>) -> Self {
        Self { config, store }
    }

    /// Count a request from `client` and decide whether it may proceed
    ///
    /// A failing counter store lets the request through.
    pub async fn check(&self, client: &str) -> Decision {
        let key = format!("{}:{}", self.config.name, client);

        let hit = match self.store.increment(&key, self.config.window).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Rate limiter {} could not count request: {}", self.config.name, e);
                return Decision::Allowed {
                    remaining: self.config.max_requests,
                };
            }
        };

        let max = u64::from(self.config.max_requests);
        if hit.count > max {
            if hit.count == max + 1 {
                info!(
                    "Rate limit {} reached for {} for {} seconds",
                    self.config.name,
                    client,
                    hit.reset_after.as_secs()
                );
            }
            return Decision::Limited {
                retry_after: hit.reset_after,
            };
        }

        Decision::Allowed {
            remaining: u32::try_from(max - hit.count).unwrap_or(0),
        }
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(15 * 60);

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(
            RateLimiterConfig::auth(max_requests, WINDOW),
            Arc::new(MemoryCounterStore::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_request_in_window_is_limited() {
        let limiter = limiter(5);

        for expected_remaining in (0..5).rev() {
            assert_eq!(
                limiter.check("10.0.0.1").await,
                Decision::Allowed {
                    remaining: expected_remaining
                }
            );
        }

        assert!(matches!(
            limiter.check("10.0.0.1").await,
            Decision::Limited { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_counted_separately() {
        let limiter = limiter(1);

        assert!(matches!(limiter.check("10.0.0.1").await, Decision::Allowed { .. }));
        assert!(matches!(limiter.check("10.0.0.2").await, Decision::Allowed { .. }));
        assert!(matches!(limiter.check("10.0.0.1").await, Decision::Limited { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_restores_budget() {
        let limiter = limiter(2);

        limiter.check("10.0.0.1").await;
        tokio::time::advance(Duration::from_secs(60)).await;
        limiter.check("10.0.0.1").await;

        match limiter.check("10.0.0.1").await {
            Decision::Limited { retry_after } => {
                assert_eq!(retry_after, WINDOW - Duration::from_secs(60))
            }
            other => panic!("expected limit, got {other:?}"),
        }

        tokio::time::advance(WINDOW).await;
        assert_eq!(
            limiter.check("10.0.0.1").await,
            Decision::Allowed { remaining: 1 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_limiters_sharing_a_store_do_not_interfere() {
        let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
        let auth = RateLimiter::new(RateLimiterConfig::auth(1, WINDOW), store.clone());
        let api = RateLimiter::new(RateLimiterConfig::api(1, WINDOW), store);

        assert!(matches!(auth.check("10.0.0.1").await, Decision::Allowed { .. }));
        assert!(matches!(api.check("10.0.0.1").await, Decision::Allowed { .. }));
        assert!(matches!(auth.check("10.0.0.1").await, Decision::Limited { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_windows_are_swept_at_most_once_per_window() {
        let store = MemoryCounterStore::new();
        let window = Duration::from_secs(60);

        for i in 0..=SWEEP_THRESHOLD {
            store.increment(&format!("a:{i}"), window).await.unwrap();
        }
        tokio::time::advance(window).await;

        store.increment("b:0", window).await.unwrap();
        assert_eq!(store.tracked_keys().await, 1);

        for i in 0..=SWEEP_THRESHOLD {
            store.increment(&format!("c:{i}"), window).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(1)).await;

        // Swept less than a window ago, so nothing is scanned
        store.increment("d:0", window).await.unwrap();
        assert_eq!(store.tracked_keys().await, SWEEP_THRESHOLD + 3);

        tokio::time::advance(window).await;
        store.increment("e:0", window).await.unwrap();
        assert_eq!(store.tracked_keys().await, 1);
    }

    struct BrokenStore;

    #[async_trait]
    impl CounterStore for BrokenStore {
        async fn increment(&self, _key: &str, _window: Duration) -> Result<Hit, RateLimitError> {
            Err(RateLimitError::Store(common::error::CacheError::Command(
                redis::RedisError::from((redis::ErrorKind::IoError, "connection reset")),
            )))
        }
    }

    #[tokio::test]
    async fn test_store_failure_lets_requests_through() {
        let limiter = RateLimiter::new(RateLimiterConfig::api(1, WINDOW), Arc::new(BrokenStore));

        for _ in 0..3 {
            assert!(matches!(limiter.check("10.0.0.1").await, Decision::Allowed { .. }));
        }
    }
}
