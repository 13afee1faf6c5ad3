//! Application state shared across handlers

use std::sync::Arc;

use common::cache::{RedisConfig, RedisPool};
use common::error::CacheResult;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    config::{CounterBackend, RateLimitSettings},
    rate_limiter::{
        CounterStore, MemoryCounterStore, RateLimiter, RateLimiterConfig, RedisCounterStore,
    },
    repositories::{MemoryStore, PostRepository, PostStore, UserRepository, UserStore},
    services::{AuthService, PostService, ProfileService},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub profiles: ProfileService,
    pub posts: PostService,
    /// Kept for the health probe and seeding
    pub users: Arc<dyn UserStore>,
    pub auth_limiter: RateLimiter,
    pub api_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
        auth_limiter: RateLimiter,
        api_limiter: RateLimiter,
    ) -> Self {
        Self {
            auth: AuthService::new(users.clone()),
            profiles: ProfileService::new(users.clone()),
            posts: PostService::new(users.clone(), posts),
            users,
            auth_limiter,
            api_limiter,
        }
    }

    /// State over a fresh [`MemoryStore`]
    pub fn in_memory(auth_limiter: RateLimiter, api_limiter: RateLimiter) -> Self {
        let store = MemoryStore::new();
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store),
            auth_limiter,
            api_limiter,
        )
    }

    /// State over the PostgreSQL repositories
    pub fn postgres(pool: PgPool, auth_limiter: RateLimiter, api_limiter: RateLimiter) -> Self {
        Self::new(
            Arc::new(UserRepository::new(pool.clone())),
            Arc::new(PostRepository::new(pool)),
            auth_limiter,
            api_limiter,
        )
    }
}

/// Build the auth and API limiters over one counter store
pub fn build_limiters(
    settings: &RateLimitSettings,
    store: Arc<dyn CounterStore>,
) -> (RateLimiter, RateLimiter) {
    let window = settings.window();
    let auth = RateLimiter::new(
        RateLimiterConfig::auth(settings.auth_max_requests, window),
        store.clone(),
    );
    let api = RateLimiter::new(
        RateLimiterConfig::api(settings.api_max_requests, window),
        store,
    );
    (auth, api)
}

/// Open the configured counter store
///
/// An unreachable Redis falls back to process-local counters.
pub async fn counter_store(settings: &RateLimitSettings) -> Arc<dyn CounterStore> {
    match settings.backend {
        CounterBackend::Memory => Arc::new(MemoryCounterStore::new()),
        CounterBackend::Redis => match connect_redis().await {
            Ok(redis_pool) => {
                info!("Rate limit counters stored in Redis");
                Arc::new(RedisCounterStore::new(redis_pool))
            }
            Err(e) => {
                warn!("Redis unavailable, using in-memory rate limit counters: {}", e);
                Arc::new(MemoryCounterStore::new())
            }
        },
    }
}

async fn connect_redis() -> CacheResult<RedisPool> {
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;
    redis_pool.health_check().await?;
    Ok(redis_pool)
}
