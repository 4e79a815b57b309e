//! Rate limiting utilities

use std::time::Duration;

use governor::{
    middleware::NoOpMiddleware,
    nanos::Nanos,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

use super::time::SessionClock;

/// Rate limiter type alias, driven by the session clock
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, SessionClock, NoOpMiddleware<Nanos>>;

/// Create a limiter that lets one cell through per `period` (burst of one).
/// Returns `None` for a zero period.
pub fn create_limiter(period: Duration, clock: &SessionClock) -> Option<Limiter> {
    Quota::with_period(period).map(|quota| RateLimiter::direct_with_clock(quota, clock))
}

/// Throttle for the periodic position message
///
/// Sends are opportunistic: the prediction loop asks on every frame that has
/// something new to say, and the throttle answers whether the interval since
/// the last granted send has elapsed.
pub struct SendThrottle {
    limiter: Option<Limiter>,
    interval: Duration,
}

impl SendThrottle {
    pub fn new(interval: Duration, clock: &SessionClock) -> Self {
        Self {
            limiter: create_limiter(interval, clock),
            interval,
        }
    }

    /// Check if a send is allowed now (consumes the slot when it is)
    pub fn try_acquire(&self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => true,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
