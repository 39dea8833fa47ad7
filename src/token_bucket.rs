// src/token_bucket.rs

// bucket-limiter: a blocking token bucket refilled by a background thread.

// dependencies
use crate::clock::{Clock, SystemClock};
use crate::config::TokenBucketConfig;
use crate::errors::RateLimiterError;
use crate::replenisher::{self, Schedule};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Lifecycle of a limiter as seen from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterState {
    /// Replenishment is active.
    Running,
    /// Replenishment stopped after repeated faults. Remaining tokens can still be
    /// acquired, but no new ones will arrive.
    Degraded,
    /// The limiter was disposed; every acquisition fails.
    Disposed,
}

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    waiting: usize,
    lifecycle: LimiterState,
}

/// Bounded token counter guarded by one lock and one condition.
#[derive(Debug)]
pub(crate) struct Bucket {
    capacity: u32,
    state: Mutex<BucketState>,
    available: Condvar,
}

impl Bucket {
    fn full(capacity: u32) -> Self {
        Self {
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                waiting: 0,
                lifecycle: LimiterState::Running,
            }),
            available: Condvar::new(),
        }
    }

    /// Adds one token unless the bucket is full or closed. Returns whether a token was added.
    pub(crate) fn add_token(&self) -> bool {
        let mut state = self.state.lock();
        if state.lifecycle == LimiterState::Disposed {
            return false;
        }
        debug_assert!(
            state.tokens <= self.capacity,
            "token count {} above capacity {}",
            state.tokens,
            self.capacity
        );
        if state.tokens >= self.capacity {
            state.tokens = self.capacity;
            return false;
        }
        state.tokens += 1;
        self.available.notify_all();
        true
    }

    pub(crate) fn degrade(&self) {
        let mut state = self.state.lock();
        if state.lifecycle == LimiterState::Running {
            state.lifecycle = LimiterState::Degraded;
        }
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.lifecycle = LimiterState::Disposed;
        self.available.notify_all();
    }

    fn take(&self, deadline: Option<Instant>) -> Result<(), RateLimiterError> {
        let mut state = self.state.lock();
        state.waiting += 1;
        let outcome = loop {
            if state.lifecycle == LimiterState::Disposed {
                break Err(RateLimiterError::Disposed);
            }
            if state.tokens > 0 {
                state.tokens -= 1;
                break Ok(());
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        break Err(RateLimiterError::Timeout);
                    }
                    self.available.wait_until(&mut state, deadline);
                }
                None => self.available.wait(&mut state),
            }
        };
        state.waiting -= 1;
        outcome
    }

    fn try_take(&self) -> Result<bool, RateLimiterError> {
        let mut state = self.state.lock();
        if state.lifecycle == LimiterState::Disposed {
            return Err(RateLimiterError::Disposed);
        }
        if state.tokens == 0 {
            return Ok(false);
        }
        state.tokens -= 1;
        Ok(true)
    }
}

/// State shared between a limiter and its replenishment thread.
#[derive(Debug)]
pub(crate) struct Shared<C> {
    pub(crate) bucket: Bucket,
    pub(crate) clock: C,
    pub(crate) stop: AtomicBool,
    pub(crate) failures: AtomicU64,
}

/// The main TokenBucketRateLimiter model.
/// C is the clock type driving replenishment, defaulting to SystemClock.
///
/// The bucket starts full with `rate_per_second` tokens and a background thread
/// adds one token every `1 / rate_per_second` clock-seconds, never past capacity.
/// Waiters are admitted in no particular order.
///
/// Dropping the limiter disposes it. A caller blocked in [`acquire`] on a
/// [`LimiterState::Degraded`] limiter with an empty bucket waits forever; use
/// [`acquire_timeout`] where that matters.
///
/// [`acquire`]: TokenBucketRateLimiter::acquire
/// [`acquire_timeout`]: TokenBucketRateLimiter::acquire_timeout
#[derive(Debug)]
pub struct TokenBucketRateLimiter<C = SystemClock>
where
    C: Clock + 'static,
{
    shared: Arc<Shared<C>>,
    interval: f64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

// methods for the TokenBucketRateLimiter type
impl<C> TokenBucketRateLimiter<C>
where
    C: Clock + 'static,
{
    // create a limiter admitting `rate_per_second` operations per second of clock time
    pub fn new(rate_per_second: u32, clock: C) -> Result<Self, RateLimiterError> {
        Self::with_config(TokenBucketConfig::new(rate_per_second), clock)
    }

    // create a limiter from a config object
    pub fn with_config(config: TokenBucketConfig, clock: C) -> Result<Self, RateLimiterError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            bucket: Bucket::full(config.rate_per_second),
            clock,
            stop: AtomicBool::new(false),
            failures: AtomicU64::new(0),
        });
        let schedule = Schedule {
            origin: shared.clock.now(),
            rate: config.rate_per_second,
            max_consecutive_failures: config.max_consecutive_failures,
        };

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(config.thread_name.clone())
                .spawn(move || replenisher::run(shared, schedule))?
        };
        log::debug!(
            "token bucket started with capacity {} on thread {:?}",
            config.rate_per_second,
            config.thread_name
        );

        Ok(Self {
            shared,
            interval: config.interval(),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Blocks until a token is available and takes it.
    ///
    /// Fails with [`RateLimiterError::Disposed`] once the limiter is disposed,
    /// including for callers that were already waiting.
    pub fn acquire(&self) -> Result<(), RateLimiterError> {
        self.shared.bucket.take(None)
    }

    /// Like [`acquire`](Self::acquire) but gives up after `timeout` of real time.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<(), RateLimiterError> {
        self.shared.bucket.take(Some(Instant::now() + timeout))
    }

    /// Takes a token if one is available right now.
    pub fn try_acquire(&self) -> Result<bool, RateLimiterError> {
        self.shared.bucket.try_take()
    }

    /// Stops replenishment and waits for the background thread to exit.
    ///
    /// Callers blocked in `acquire` are released with an error. Calling this more
    /// than once is harmless.
    pub fn dispose(&self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.bucket.close();
        self.shared.clock.wake_sleepers();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                log::error!("replenishment thread panicked during shutdown");
            }
            log::debug!("token bucket disposed");
        }
    }

    /// Alias for [`dispose`](Self::dispose).
    pub fn stop(&self) {
        self.dispose();
    }

    // accessor method to return the bucket capacity (equal to the rate per second)
    pub fn capacity(&self) -> u32 {
        self.shared.bucket.capacity
    }

    // accessor method to return the clock-seconds between two refills
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Tokens currently in the bucket.
    pub fn available(&self) -> u32 {
        self.shared.bucket.state.lock().tokens
    }

    /// Callers currently blocked waiting for a token.
    pub fn waiting(&self) -> usize {
        self.shared.bucket.state.lock().waiting
    }

    pub fn state(&self) -> LimiterState {
        self.shared.bucket.state.lock().lifecycle
    }

    /// Total replenishment faults observed since construction.
    pub fn replenish_failures(&self) -> u64 {
        self.shared.failures.load(Ordering::Relaxed)
    }

    pub fn clock(&self) -> &C {
        &self.shared.clock
    }
}

impl<C> Drop for TokenBucketRateLimiter<C>
where
    C: Clock + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}
