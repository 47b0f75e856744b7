//! Inter-ticker request pacing.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::clock::Sleeper;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Enforces a minimum spacing between provider requests. The first request
/// passes immediately; each subsequent one within the window yields the
/// configured delay for the caller to sleep.
#[derive(Clone)]
pub struct RequestPacer {
    min_interval: Duration,
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        let limiter = Quota::with_period(min_interval)
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(one()))));
        Self {
            min_interval,
            limiter,
        }
    }

    /// No spacing at all; scripted sources in tests do not need pacing.
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns the recommended wait when the rate budget is exhausted.
    pub fn acquire(&self) -> Result<(), Duration> {
        match &self.limiter {
            Some(limiter) if limiter.check().is_err() => Err(self.min_interval),
            _ => Ok(()),
        }
    }

    /// Blocks (via `sleeper`) until the next request may start. The token
    /// that regenerates during the pause is consumed, so consecutive
    /// callers stay spaced instead of alternating free/paced.
    pub fn throttle(&self, sleeper: &dyn Sleeper) {
        if let Err(delay) = self.acquire() {
            sleeper.sleep(delay);
            let _ = self.acquire();
        }
    }
}

fn one() -> NonZeroU32 {
    NonZeroU32::new(1).expect("1 is non-zero")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::RecordingSleeper;

    #[test]
    fn first_request_is_not_delayed() {
        let pacer = RequestPacer::new(Duration::from_secs(1));
        assert!(pacer.acquire().is_ok());
    }

    #[test]
    fn back_to_back_requests_yield_the_interval() {
        let pacer = RequestPacer::new(Duration::from_secs(1));
        let sleeper = RecordingSleeper::new();

        pacer.throttle(&sleeper);
        pacer.throttle(&sleeper);
        pacer.throttle(&sleeper);

        let slept = sleeper.recorded();
        assert_eq!(slept.len(), 2);
        assert!(slept.iter().all(|d| *d == Duration::from_secs(1)));
    }

    #[test]
    fn wall_clock_spacing_holds_for_every_consecutive_pair() {
        use std::time::Instant;

        use crate::clock::ThreadSleeper;

        let pacer = RequestPacer::new(Duration::from_millis(50));
        let mut stamps = Vec::new();
        for _ in 0..4 {
            pacer.throttle(&ThreadSleeper);
            stamps.push(Instant::now());
        }

        // Every later request waits out the interval, not just every other.
        for pair in stamps.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(45), "gap was {gap:?}");
        }
    }

    #[test]
    fn zero_interval_disables_pacing() {
        let pacer = RequestPacer::unpaced();
        let sleeper = RecordingSleeper::new();
        for _ in 0..5 {
            pacer.throttle(&sleeper);
        }
        assert!(sleeper.recorded().is_empty());
    }
}
