//! Redis module for the Conview services
//!
//! This module provides the Redis connection used for counters shared between
//! several service instances, such as rate-limit windows.

use crate::error::{CacheError, CacheResult};
use redis::{Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Counter state after a hit on a windowed counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Hits recorded in the current window, this one included
    pub count: u64,
    /// Time left before the window closes
    pub remaining: Duration,
}

/// Redis connection handle, cheap to clone
#[derive(Clone)]
pub struct RedisPool {
    connection: ConnectionManager,
}

impl RedisPool {
    /// Connect to Redis
    pub async fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(CacheError::Connection)?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { connection })
    }

    /// Record a hit on the counter stored at `key`
    ///
    /// The first hit creates the counter with a time-to-live of `window`; later
    /// hits increment it without extending that time-to-live. The three steps
    /// run as one atomic pipeline.
    pub async fn increment_window(&self, key: &str, window: Duration) -> CacheResult<WindowCount> {
        let mut conn = self.connection.clone();
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);

        let (count, ttl_ms): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("NX")
            .arg("PX")
            .arg(window_ms)
            .ignore()
            .incr(key, 1)
            .pttl(key)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;

        // PTTL is negative only for a key without expiry; report the full window then.
        let remaining = match u64::try_from(ttl_ms) {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => window,
        };

        Ok(WindowCount { count, remaining })
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_redis_config_default_url() {
        unsafe {
            std::env::remove_var("REDIS_URL");
        }

        let config = RedisConfig::from_env().unwrap();
        assert_eq!(config.url, "redis://localhost:6379");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_increment_window_counts_within_window() -> CacheResult<()> {
        let pool = RedisPool::new(&RedisConfig::from_env()?).await?;
        assert!(pool.health_check().await?);

        let key = format!("common-test:{}", std::process::id());
        let window = Duration::from_secs(5);

        let first = pool.increment_window(&key, window).await?;
        let second = pool.increment_window(&key, window).await?;

        assert_eq!(first.count, 1);
        assert_eq!(second.count, 2);
        assert!(second.remaining <= window);
        Ok(())
    }
}
