//! Conview social network backend
//!
//! Accounts, profiles, one-directional friend lists and a post feed served
//! over a JSON API, with per-client rate limits and a guarded static file
//! fallback.

pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod validation;

pub use config::AppConfig;
pub use routes::create_router;
pub use state::AppState;
