//! Service configuration
//!
//! Built-in defaults are overlaid by `CONVIEW_*` environment variables, with
//! `__` separating nested keys (`CONVIEW_RATE_LIMIT__BACKEND=redis`). A bare
//! `PORT` variable overrides the port.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Where users and posts are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Where rate-limit counters live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    pub backend: CounterBackend,
    pub window_secs: u64,
    pub auth_max_requests: u32,
    pub api_max_requests: u32,
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Service configuration struct
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for unmatched paths
    pub static_dir: PathBuf,
    pub store: StoreBackend,
    pub rate_limit: RateLimitSettings,
}

impl AppConfig {
    /// Load the configuration from defaults and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("static_dir", "public")?
            .set_default("store", "postgres")?
            .set_default("rate_limit.backend", "memory")?
            .set_default("rate_limit.window_secs", 15 * 60)?
            .set_default("rate_limit.auth_max_requests", 5)?
            .set_default("rate_limit.api_max_requests", 100)?
            .add_source(
                Environment::with_prefix("CONVIEW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("port", env::var("PORT").ok())?
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;

        if app_config.rate_limit.window_secs == 0 {
            return Err(ConfigError::Message(
                "rate_limit.window_secs must be greater than zero".to_string(),
            ));
        }

        Ok(app_config)
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
