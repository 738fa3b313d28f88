//! Time sources for step scheduling and acknowledgment deadlines
//!
//! The node never reads the time directly. It asks an injected [`Clock`], so
//! the retry cadence does not depend on how fast the outer loop spins and
//! tests can move time by hand.

use core::cell::Cell;

use embassy_time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Clock backed by the embassy-time driver of the platform
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock
///
/// Time only moves when [`ManualClock::advance`] is called, or by a fixed
/// step on every reading when built with [`ManualClock::with_auto_advance`].
/// The auto-advancing variant behaves like a loop-iteration counter, which
/// keeps bounded waits finite in single-threaded simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
    auto_advance: Duration,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub const fn new() -> Self {
        Self::with_auto_advance(Duration::from_ticks(0))
    }

    pub const fn with_auto_advance(step: Duration) -> Self {
        ManualClock {
            now: Cell::new(Instant::from_ticks(0)),
            auto_advance: step,
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Current time without triggering the auto-advance step
    pub fn peek(&self) -> Instant {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let now = self.now.get();
        self.now.set(now + self.auto_advance);
        now
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.now(), start);
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn auto_advance_steps_on_every_reading() {
        let clock = ManualClock::with_auto_advance(Duration::from_millis(10));
        let first = clock.now();
        let second = clock.now();
        assert_eq!(second - first, Duration::from_millis(10));
        assert_eq!(clock.peek() - second, Duration::from_millis(10));
    }

    #[test]
    fn references_are_clocks() {
        fn read<C: Clock>(clock: C) -> Instant {
            clock.now()
        }
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(1));
        assert_eq!(read(&clock), Instant::from_ticks(0) + Duration::from_secs(1));
    }
}
