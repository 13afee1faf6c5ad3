//! Custom error types for the common library
//!
//! This module defines infrastructure error types shared by the services.

use redis::RedisError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Custom error type for Redis operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// The Redis URL could not be parsed or the server could not be reached
    #[error("Redis connection error: {0}")]
    Connection(#[source] RedisError),

    /// A command failed on an established connection
    #[error("Redis command error: {0}")]
    Command(#[source] RedisError),
}

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
