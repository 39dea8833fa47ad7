// src/replenisher.rs

// background refill loop owned by a TokenBucketRateLimiter

// dependencies
use crate::clock::Clock;
use crate::token_bucket::Shared;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Timing parameters handed to the replenishment thread.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Schedule {
    /// Clock reading at construction; the first tick is due one interval later.
    pub(crate) origin: f64,
    pub(crate) rate: u32,
    pub(crate) max_consecutive_failures: u32,
}

/// Refill loop. Tick `k` is due at `origin + k / rate`, computed afresh for every
/// tick so rounding never accumulates and advances summing to `S` seconds produce
/// `floor(S * rate)` ticks.
///
/// A clock error or panic is counted and retried from a fresh deadline; after
/// `max_consecutive_failures` in a row the bucket is marked degraded and the loop exits.
pub(crate) fn run<C: Clock>(shared: Arc<Shared<C>>, schedule: Schedule) {
    log::debug!(
        "replenishment started, {} token(s) per second",
        schedule.rate
    );

    let rate = f64::from(schedule.rate);
    let mut origin = schedule.origin;
    let mut tick = 0u64;
    let mut consecutive_failures = 0u32;

    while !shared.stop.load(Ordering::Acquire) {
        tick += 1;
        let deadline = origin + tick as f64 / rate;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            shared.clock.sleep_until(deadline, &shared.stop)
        }));
        let fault = match outcome {
            Ok(Ok(true)) => {
                consecutive_failures = 0;
                if shared.bucket.add_token() {
                    log::trace!("token added at {deadline}s");
                } else {
                    log::trace!("bucket full at {deadline}s, tick dropped");
                }
                continue;
            }
            Ok(Ok(false)) => break,
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        consecutive_failures += 1;
        shared.failures.fetch_add(1, Ordering::Relaxed);
        if consecutive_failures >= schedule.max_consecutive_failures {
            log::error!(
                "replenishment halted after {consecutive_failures} consecutive faults, last: {fault}"
            );
            shared.bucket.degrade();
            break;
        }
        log::warn!(
            "replenishment fault {consecutive_failures}/{}: {fault}; retrying",
            schedule.max_consecutive_failures
        );

        // restart the schedule from the current reading
        origin = panic::catch_unwind(AssertUnwindSafe(|| shared.clock.now())).unwrap_or(deadline);
        tick = 0;
    }

    log::debug!("replenishment stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "replenishment panicked".to_string()
    }
}
