//! Pool error types.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Worker allocation or thread creation failed during init.
    OutOfMemory,
    /// No parked worker was available and a new one could not be
    /// created; a transient condition, the caller is expected to retry.
    Retry,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "worker allocation failed"),
            Self::Retry => write!(f, "no worker available, retry"),
        }
    }
}

impl std::error::Error for PoolError {}

pub type Result<T> = std::result::Result<T, PoolError>;
