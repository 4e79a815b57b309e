//! Time utilities for the client simulation

use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::nanos::Nanos;
use parking_lot::Mutex;

/// Monotonic session clock
///
/// Every time-dependent part of the client (frame deltas, the send throttle,
/// dust lifetimes) reads this clock, so a manual clock drives the whole
/// session deterministically in tests.
#[derive(Debug, Clone)]
pub struct SessionClock {
    source: ClockSource,
}

#[derive(Debug, Clone)]
enum ClockSource {
    System { origin: Instant },
    Manual { elapsed: Arc<Mutex<Duration>> },
}

impl SessionClock {
    /// Wall-clock time measured from construction
    pub fn system() -> Self {
        Self {
            source: ClockSource::System {
                origin: Instant::now(),
            },
        }
    }

    /// Virtual time starting at zero, moved only by [`SessionClock::advance`]
    pub fn manual() -> Self {
        Self {
            source: ClockSource::Manual {
                elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            },
        }
    }

    /// Time since the clock origin
    pub fn elapsed(&self) -> Duration {
        match &self.source {
            ClockSource::System { origin } => origin.elapsed(),
            ClockSource::Manual { elapsed } => *elapsed.lock(),
        }
    }

    /// Moves a manual clock forward. No effect on the system clock.
    pub fn advance(&self, by: Duration) {
        if let ClockSource::Manual { elapsed } = &self.source {
            *elapsed.lock() += by;
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.source, ClockSource::Manual { .. })
    }
}

impl governor::clock::Clock for SessionClock {
    type Instant = Nanos;

    fn now(&self) -> Self::Instant {
        Nanos::from(self.elapsed())
    }
}
