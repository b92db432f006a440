/*!
 * Adaptive Spin-Wait with Exponential Backoff
 *
 * Bounded spin phase that runs before a task parks. Waits that resolve within
 * a few microseconds never touch the OS scheduler; longer ones give up the
 * spin budget quickly and park.
 *
 * 1. **Tight spin phase**: just `spin_loop()` hint
 * 2. **Yield phase**: `yield_now()` every iteration
 * 3. **Backoff phase**: exponentially increasing sleep, capped
 */

use super::config::SyncConfig;
use crate::core::limits::{SPIN_HINT_ITERATIONS, SPIN_MAX_BACKOFF, SPIN_YIELD_ITERATIONS};
use std::thread;
use std::time::{Duration, Instant};

/// Adaptive spin-wait with exponential backoff
#[derive(Debug, Clone, Copy)]
pub struct SpinWait {
    /// Spin duration before giving up
    spin_duration: Duration,
    /// Maximum spin iterations
    max_spins: u32,
}

impl SpinWait {
    pub fn new(spin_duration: Duration, max_spins: u32) -> Self {
        Self {
            spin_duration,
            max_spins,
        }
    }

    /// Spin budget derived from a config; zero budget when the config parks
    pub fn from_config(config: &SyncConfig) -> Self {
        if config.spins() {
            Self::new(config.spin_duration, config.max_spins)
        } else {
            Self::new(Duration::ZERO, 0)
        }
    }

    /// Spin until `check` returns true or the budget is exhausted
    ///
    /// Returns true if `check` succeeded.
    pub fn spin(&self, mut check: impl FnMut() -> bool) -> bool {
        if check() {
            return true;
        }
        if self.max_spins == 0 {
            return false;
        }

        let start = Instant::now();
        let mut spin_count = 0u32;
        let mut backoff_ns = 1u64;

        loop {
            if start.elapsed() >= self.spin_duration || spin_count >= self.max_spins {
                return false;
            }

            if spin_count < SPIN_HINT_ITERATIONS {
                std::hint::spin_loop();
            } else if spin_count < SPIN_YIELD_ITERATIONS {
                thread::yield_now();
            } else {
                thread::sleep(Duration::from_nanos(backoff_ns));
                backoff_ns = (backoff_ns * 2).min(SPIN_MAX_BACKOFF.as_nanos() as u64);
            }

            spin_count += 1;

            if check() {
                return true;
            }
        }
    }
}
