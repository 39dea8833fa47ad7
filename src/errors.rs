// src/errors.rs

// error handling for the token bucket rate limiter

// dependencies
use thiserror::Error;

use crate::clock::ClockError;

/// Error type for TokenBucketRateLimiter construction and admission.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RateLimiterError {
    #[error("Rate must be positive")]
    InvalidRate, // for rate == 0
    #[error("Failure budget must allow at least one replenishment fault")]
    InvalidFailureBudget, // for max_consecutive_failures == 0
    #[error("Clock error occurred: {0}")]
    Clock(#[from] ClockError),
    #[error("Failed to spawn the replenishment thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Rate limiter has been disposed")]
    Disposed,
    #[error("Timed out waiting for a token")]
    Timeout,
}
