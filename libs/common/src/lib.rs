//! Common library for the Conview services
//!
//! This crate provides shared infrastructure used by the services: the
//! PostgreSQL connection pool, the Redis connection used for shared counters,
//! and the error types for both.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_lazy_pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_lazy_pool(&config)?;
//!     println!("Database health check: {}", health_check(&pool).await);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
