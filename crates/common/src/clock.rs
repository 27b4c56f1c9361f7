//! Monotonic timing for periodic work in long-running loops.

use std::time::Instant;

/// Nanoseconds elapsed since a fixed start instant.
#[derive(Debug, Clone, Copy)]
pub struct StreamClock {
    epoch: Instant,
}

impl StreamClock {
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub fn elapsed_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Fires at most once per interval. The first call always fires.
#[derive(Debug)]
pub struct RateController {
    interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Negative or NaN intervals fire on every call; infinite ones only once.
    pub fn every_secs(secs: f64) -> Self {
        Self {
            interval_ns: (secs.max(0.0) * 1e9) as u64,
            last_tick_ns: None,
        }
    }

    pub fn should_tick(&mut self, now_ns: u64) -> bool {
        let due = match self.last_tick_ns {
            None => true,
            Some(last) => now_ns.saturating_sub(last) >= self.interval_ns,
        };
        if due {
            self.last_tick_ns = Some(now_ns);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = StreamClock::start();
        let a = clock.elapsed_ns();
        let b = clock.elapsed_ns();
        assert!(b >= a);
        assert!(a < 1_000_000_000);
    }

    #[test]
    fn test_ticks_once_per_interval() {
        let mut ctrl = RateController::every_secs(5.0);
        assert!(ctrl.should_tick(0));
        assert!(!ctrl.should_tick(4_999_999_999));
        assert!(ctrl.should_tick(5_000_000_000));
        assert!(!ctrl.should_tick(6_000_000_000));
    }

    #[test]
    fn test_degenerate_intervals() {
        let mut always = RateController::every_secs(f64::NAN);
        assert!(always.should_tick(10));
        assert!(always.should_tick(10));

        let mut once = RateController::every_secs(f64::INFINITY);
        assert!(once.should_tick(0));
        assert!(!once.should_tick(u64::MAX - 1));
    }
}
