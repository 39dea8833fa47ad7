// tests/ratelimiter/error_tests.rs

#[cfg(test)]
mod tests {
    use crate::fixtures::{PATIENCE, manual_limiter};
    use bucket_limiter::{
        Clock, ClockError, ManualClock, RateLimiterError, SteppingClock, SystemClock,
        TokenBucketRateLimiter,
    };
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn zero_rate_is_rejected_for_every_clock() {
        assert!(matches!(
            TokenBucketRateLimiter::new(0, SystemClock).unwrap_err(),
            RateLimiterError::InvalidRate
        ));
        assert!(matches!(
            TokenBucketRateLimiter::new(0, ManualClock::new()).unwrap_err(),
            RateLimiterError::InvalidRate
        ));
        assert!(matches!(
            TokenBucketRateLimiter::new(0, SteppingClock::new()).unwrap_err(),
            RateLimiterError::InvalidRate
        ));
    }

    #[test]
    fn negative_advance_leaves_clock_and_waiters_untouched() {
        let clock = Arc::new(ManualClock::new());
        let sleeper = {
            let clock = Arc::clone(&clock);
            thread::spawn(move || clock.sleep(1.0))
        };
        assert!(clock.wait_for_sleepers(1, PATIENCE));

        let result = clock.advance(-0.25);
        match result {
            Err(ClockError::InvalidDuration { seconds }) => assert_eq!(seconds, -0.25),
            other => panic!("Expected InvalidDuration, got: {:?}", other),
        }
        assert_eq!(clock.now(), 0.0);
        assert_eq!(clock.pending_sleepers(), 1);
        assert!(!sleeper.is_finished());

        clock.advance(1.0).unwrap();
        sleeper.join().unwrap().unwrap();
    }

    #[test]
    fn non_finite_advance_is_rejected() {
        let clock = ManualClock::new();
        assert!(clock.advance(f64::NAN).is_err());
        assert!(clock.advance(f64::INFINITY).is_err());
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn negative_start_is_rejected() {
        assert!(matches!(
            ManualClock::starting_at(-1.0),
            Err(ClockError::InvalidDuration { .. })
        ));
        assert!(SteppingClock::starting_at(-1.0).is_err());
    }

    #[test]
    fn clock_errors_convert_into_limiter_errors() {
        let error: RateLimiterError = ClockError::Unavailable("offline".to_string()).into();
        assert!(matches!(error, RateLimiterError::Clock(ClockError::Unavailable(_))));
    }

    #[test]
    fn acquire_after_dispose_fails() {
        let (_clock, limiter) = manual_limiter(2);
        limiter.dispose();
        assert!(matches!(limiter.acquire(), Err(RateLimiterError::Disposed)));
        assert!(matches!(limiter.try_acquire(), Err(RateLimiterError::Disposed)));
    }

    #[test]
    fn error_display_formatting() {
        let clock_error = ClockError::InvalidDuration { seconds: -2.0 };
        let clock_message = clock_error.to_string();
        assert!(clock_message.contains("clock"));
        assert!(clock_message.contains("-2"));

        let limiter_error = RateLimiterError::from(clock_error);
        assert!(limiter_error.to_string().to_lowercase().contains("clock"));

        assert_eq!(RateLimiterError::InvalidRate.to_string(), "Rate must be positive");
        assert!(!RateLimiterError::Disposed.to_string().is_empty());
        assert!(!RateLimiterError::Timeout.to_string().is_empty());
    }
}
