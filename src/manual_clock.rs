// src/manual_clock.rs

//! Simulated clocks whose time only moves when told to.
//!
//! [`ManualClock`] is the thread-coordinated variant: callers of `sleep` block on a
//! condition variable until another thread pushes simulated time past their target
//! with [`ManualClock::advance`]. [`SteppingClock`] is the single-threaded variant
//! where `sleep` simply moves the counter forward.

// dependencies
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::clock::{Clock, ClockError, validate_span};

#[derive(Debug, Default)]
struct ManualState {
    now: f64,
    // targets of callers currently blocked in sleep
    sleepers: Vec<f64>,
}

impl ManualState {
    fn pending(&self) -> usize {
        self.sleepers.iter().filter(|&&target| target > self.now).count()
    }
}

/// A deterministic clock for driving concurrent code from tests.
///
/// Time starts at the configured origin (zero by default) and never moves on its
/// own. Every blocked sleeper waits on the same condition; an `advance` broadcasts
/// to all of them and each re-checks its own target, so one advance may release
/// some sleepers and leave others blocked.
#[derive(Debug, Default)]
pub struct ManualClock {
    state: Mutex<ManualState>,
    ticked: Condvar,
    sleepers_changed: Condvar,
    poll_interval: Option<Duration>,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock reading `start` seconds.
    pub fn starting_at(start: f64) -> Result<Self, ClockError> {
        validate_span(start)?;
        Ok(Self {
            state: Mutex::new(ManualState {
                now: start,
                sleepers: Vec::new(),
            }),
            ..Self::default()
        })
    }

    /// Builder-style: make blocked sleepers re-check their predicate at least every
    /// `interval` of real time, even without an advance or explicit wake.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Moves simulated time forward by `secs` and wakes every sleeper.
    ///
    /// Negative or non-finite spans are rejected and leave the clock untouched.
    pub fn advance(&self, secs: f64) -> Result<(), ClockError> {
        validate_span(secs)?;
        let mut state = self.state.lock();
        state.now += secs;
        log::trace!(
            "manual clock advanced by {secs}s to {}s, {} sleeper(s) still pending",
            state.now,
            state.pending()
        );
        self.ticked.notify_all();
        Ok(())
    }

    /// Number of callers blocked on a target that has not been reached yet.
    ///
    /// Sleepers whose target was satisfied by an advance but which have not yet
    /// woken up are not counted.
    pub fn pending_sleepers(&self) -> usize {
        self.state.lock().pending()
    }

    /// Blocks for up to `timeout` of real time until exactly `count` sleepers are
    /// pending. Returns whether the count was reached.
    pub fn wait_for_sleepers(&self, count: usize, timeout: Duration) -> bool {
        let give_up = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.pending() != count {
            if self
                .sleepers_changed
                .wait_until(&mut state, give_up)
                .timed_out()
            {
                return state.pending() == count;
            }
        }
        true
    }

    // Core wait loop. The caller holds the lock; it is released while blocked.
    fn block_until(
        &self,
        mut state: MutexGuard<'_, ManualState>,
        target: f64,
        cancel: Option<&AtomicBool>,
    ) -> bool {
        let cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Acquire));

        if state.now >= target {
            return true;
        }
        if cancelled() {
            return false;
        }

        state.sleepers.push(target);
        self.sleepers_changed.notify_all();

        let reached = loop {
            if state.now >= target {
                break true;
            }
            if cancelled() {
                break false;
            }
            match self.poll_interval {
                Some(interval) => {
                    self.ticked.wait_for(&mut state, interval);
                }
                None => self.ticked.wait(&mut state),
            }
        };

        if let Some(index) = state.sleepers.iter().position(|&t| t == target) {
            state.sleepers.swap_remove(index);
        }
        self.sleepers_changed.notify_all();
        reached
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.state.lock().now
    }

    fn sleep(&self, secs: f64) -> Result<(), ClockError> {
        validate_span(secs)?;
        let state = self.state.lock();
        let target = state.now + secs;
        self.block_until(state, target, None);
        Ok(())
    }

    fn sleep_until(&self, deadline: f64, cancel: &AtomicBool) -> Result<bool, ClockError> {
        if !deadline.is_finite() {
            return Err(ClockError::InvalidDuration { seconds: deadline });
        }
        let state = self.state.lock();
        Ok(self.block_until(state, deadline, Some(cancel)))
    }

    fn wake_sleepers(&self) {
        // taking the lock orders the wake after any in-flight predicate check
        let _state = self.state.lock();
        self.ticked.notify_all();
    }
}

/// A single-threaded simulated clock: `sleep` advances time instead of blocking.
///
/// Useful for code that only needs readings to move forward deterministically. Not
/// suitable for coordinating threads, since a sleeper never waits for anyone.
///
/// Do not use it to drive a [`TokenBucketRateLimiter`](crate::TokenBucketRateLimiter):
/// every refill deadline is met instantly, so the refill thread spins at full speed
/// until the limiter is disposed.
#[derive(Debug, Default)]
pub struct SteppingClock {
    now: Mutex<f64>,
}

impl SteppingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(start: f64) -> Result<Self, ClockError> {
        validate_span(start)?;
        Ok(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, secs: f64) -> Result<(), ClockError> {
        validate_span(secs)?;
        *self.now.lock() += secs;
        Ok(())
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }

    fn sleep(&self, secs: f64) -> Result<(), ClockError> {
        self.advance(secs)
    }
}
