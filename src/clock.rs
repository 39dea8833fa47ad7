// src/clock.rs

// clock trait definition and the real-time implementation

// dependencies
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Clock trait to abstract time retrieval and blocking.
/// Implementors must be thread-safe (Send + Sync).
/// The `now` method returns monotonic seconds as an f64; the origin is arbitrary.
/// The `sleep` method blocks the caller for at least the given span in the clock's own time domain.
pub trait Clock: Send + Sync {
    /// Current reading in seconds. Never decreases.
    fn now(&self) -> f64;

    /// Blocks for at least `secs` seconds of this clock's time.
    /// Fails with [`ClockError::InvalidDuration`] for negative or non-finite spans.
    fn sleep(&self, secs: f64) -> Result<(), ClockError>;

    /// Blocks until `now() >= deadline` or until `cancel` is observed.
    ///
    /// Returns `Ok(true)` when the deadline was reached and `Ok(false)` when the
    /// sleep ended because of cancellation. The default implementation cannot be
    /// woken early: it sleeps for the whole remaining span and checks `cancel`
    /// afterwards.
    fn sleep_until(&self, deadline: f64, cancel: &AtomicBool) -> Result<bool, ClockError> {
        if cancel.load(Ordering::Acquire) {
            return Ok(false);
        }
        let remaining = deadline - self.now();
        if remaining > 0.0 {
            self.sleep(remaining)?;
        }
        Ok(!cancel.load(Ordering::Acquire))
    }

    /// Makes every caller blocked in [`Clock::sleep_until`] re-check its cancel flag.
    fn wake_sleepers(&self) {}
}

impl<C> Clock for Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn sleep(&self, secs: f64) -> Result<(), ClockError> {
        (**self).sleep(secs)
    }

    fn sleep_until(&self, deadline: f64, cancel: &AtomicBool) -> Result<bool, ClockError> {
        (**self).sleep_until(deadline, cancel)
    }

    fn wake_sleepers(&self) {
        (**self).wake_sleepers()
    }
}

/// Clock error type
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClockError {
    /// A sleep or advance span was negative, NaN or infinite.
    #[error("clock duration must be finite and non-negative, got {seconds}")]
    InvalidDuration { seconds: f64 },
    /// The clock implementation could not serve the call.
    #[error("clock unavailable: {0}")]
    Unavailable(String),
}

// shared argument check for every clock that takes a span in seconds
pub(crate) fn validate_span(seconds: f64) -> Result<(), ClockError> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(ClockError::InvalidDuration { seconds })
    }
}

// process-wide origin for SystemClock readings
fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

/// SystemClock implementation using the platform monotonic clock.
/// Readings are seconds elapsed since the first SystemClock reading in the process.
/// `sleep` blocks the calling thread for real time and cannot be interrupted.
/// This is the default clock used by the TokenBucketRateLimiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        anchor().elapsed().as_secs_f64()
    }

    fn sleep(&self, secs: f64) -> Result<(), ClockError> {
        validate_span(secs)?;
        thread::sleep(Duration::from_secs_f64(secs));
        Ok(())
    }
}
