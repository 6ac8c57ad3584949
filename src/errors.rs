//! Error types for the resource pool

use std::time::Duration;
use thiserror::Error;

/// Boxed error produced by a [`ResourceFactory`](crate::ResourceFactory)
/// when resource creation fails.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("resource factory failed: {0}")]
    Factory(#[source] FactoryError),

    #[error("no resource became available within {0:?}")]
    Timeout(Duration),

    #[error("pool is exhausted - no idle resource and no capacity left")]
    Exhausted,

    #[error("returned handle is not currently on loan from this pool")]
    InvalidReturn,

    #[error("pool is closed")]
    Closed,

    #[error("invalid pool configuration: {0}")]
    Config(String),
}

pub type PoolResult<T> = Result<T, PoolError>;
