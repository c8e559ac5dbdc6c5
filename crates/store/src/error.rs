//! Store error types

use thiserror::Error;

/// Errors from the store adapters
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to establish a store connection at startup
    #[error("store connection failed: {0}")]
    Connect(String),

    /// Postgres pool checkout failed
    #[error("postgres pool error: {0}")]
    PgPool(#[from] deadpool_postgres::PoolError),

    /// Postgres query or copy failed
    #[error("postgres error: {0}")]
    Pg(#[from] tokio_postgres::Error),

    /// Redis pool checkout failed
    #[error("redis pool error: {0}")]
    RedisPool(#[from] deadpool_redis::PoolError),

    /// Redis command or pipeline failed
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
