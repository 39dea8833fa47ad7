// src/config.rs

//! Configuration types for the token bucket rate limiter

// dependencies
use crate::errors::RateLimiterError;

pub(crate) const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;
pub(crate) const DEFAULT_THREAD_NAME: &str = "token-bucket-refill";

/// Configuration for rate limiter behavior
#[derive(Debug, Clone)]
pub struct TokenBucketConfig {
    pub(crate) rate_per_second: u32,
    pub(crate) max_consecutive_failures: u32,
    pub(crate) thread_name: String,
}

impl TokenBucketConfig {
    /// Create a new configuration. The rate doubles as the bucket capacity.
    pub fn new(rate_per_second: u32) -> Self {
        Self {
            rate_per_second,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    /// Builder-style: set rate per second
    pub fn rate(mut self, rate_per_second: u32) -> Self {
        self.rate_per_second = rate_per_second;
        self
    }

    /// Builder-style: how many replenishment faults in a row are tolerated before
    /// the limiter gives up and reports itself as degraded
    pub fn max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures;
        self
    }

    /// Builder-style: name of the replenishment thread
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RateLimiterError> {
        if self.rate_per_second == 0 {
            return Err(RateLimiterError::InvalidRate);
        }
        if self.max_consecutive_failures == 0 {
            return Err(RateLimiterError::InvalidFailureBudget);
        }
        Ok(())
    }

    /// Seconds between two replenishment ticks.
    pub(crate) fn interval(&self) -> f64 {
        1.0 / f64::from(self.rate_per_second)
    }
}
