// src/lib.rs

//! # Bucket Limiter
//!
//! A blocking token-bucket rate limiter whose refill thread runs on a pluggable
//! [`Clock`]. Production code uses [`SystemClock`]; tests drive time by hand with
//! [`ManualClock`] and get fully deterministic refills.
//!
//! ## Quick Example
//!
//! ```rust
//! use bucket_limiter::{SystemClock, TokenBucketRateLimiter};
//!
//! let limiter = TokenBucketRateLimiter::new(10, SystemClock).unwrap();
//!
//! for _ in 0..10 {
//!     limiter.acquire().unwrap();
//! }
//! // the bucket refills at one token every 100ms
//! limiter.acquire().unwrap();
//! limiter.dispose();
//! ```
//!
//! ## Simulated time
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bucket_limiter::{Clock, ManualClock, TokenBucketRateLimiter};
//!
//! let clock = Arc::new(ManualClock::new());
//! let limiter = TokenBucketRateLimiter::new(2, Arc::clone(&clock)).unwrap();
//! while limiter.try_acquire().unwrap() {}
//!
//! // wait until the refill thread is parked on its first deadline
//! assert!(clock.wait_for_sleepers(1, Duration::from_secs(5)));
//! clock.advance(0.5).unwrap();
//! limiter.acquire().unwrap();
//! assert_eq!(clock.now(), 0.5);
//! ```

// private modules
mod clock;
mod config;
mod errors;
mod manual_clock;
mod replenisher;
mod token_bucket;

// public API exports
pub use clock::{Clock, ClockError, SystemClock};
pub use config::TokenBucketConfig;
pub use errors::RateLimiterError;
pub use manual_clock::{ManualClock, SteppingClock};
pub use token_bucket::{LimiterState, TokenBucketRateLimiter};
