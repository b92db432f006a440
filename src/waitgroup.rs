/*!
 * WaitGroup
 *
 * Counts outstanding tasks; `wait` blocks until the count returns to zero.
 *
 * # Design
 *
 * Each time the counter reaches zero the generation advances and every
 * waiter is released. A waiter only watches for a generation change, so a
 * group reused right after reaching zero (count bumped again before a slow
 * waiter wakes) still releases the waiters of the finished round.
 */

use crate::core::errors::WaitGroupError;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

struct Counter {
    count: i64,
    generation: u64,
}

/// Completion counter for a group of tasks
///
/// # Examples
///
/// ```
/// use taskmesh::WaitGroup;
/// use std::sync::Arc;
/// use std::thread;
///
/// let group = Arc::new(WaitGroup::new());
/// group.add(3).unwrap();
/// for _ in 0..3 {
///     let group = group.clone();
///     thread::spawn(move || group.done().unwrap());
/// }
/// group.wait();
/// assert_eq!(group.count(), 0);
/// ```
pub struct WaitGroup {
    state: Mutex<Counter>,
    zero: Condvar,
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitGroup")
            .field("count", &self.count())
            .finish()
    }
}

impl WaitGroup {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Counter {
                count: 0,
                generation: 0,
            }),
            zero: Condvar::new(),
        }
    }

    /// Adjust the counter by `delta`
    ///
    /// A change that would take the counter below zero, or past `i64::MAX`,
    /// is rejected and leaves it untouched.
    pub fn add(&self, delta: i64) -> Result<(), WaitGroupError> {
        let mut state = self.state.lock();
        let counter = state.count;
        let next = match counter.checked_add(delta) {
            Some(next) if next >= 0 => next,
            Some(_) => {
                drop(state);
                return Err(misuse(WaitGroupError::NegativeCounter { counter, delta }));
            }
            None => {
                drop(state);
                return Err(misuse(WaitGroupError::CounterOverflow { counter, delta }));
            }
        };

        state.count = next;
        if next == 0 && delta != 0 {
            state.generation = state.generation.wrapping_add(1);
            trace!(generation = state.generation, "WaitGroup reached zero");
            self.zero.notify_all();
        }
        Ok(())
    }

    /// Shorthand for `add(-1)`
    #[inline]
    pub fn done(&self) -> Result<(), WaitGroupError> {
        self.add(-1)
    }

    /// Block until the counter reaches zero
    pub fn wait(&self) {
        let mut state = self.state.lock();
        if state.count == 0 {
            return;
        }
        let generation = state.generation;
        while state.generation == generation {
            self.zero.wait(&mut state);
        }
    }

    /// Block for at most `timeout`; returns true if the counter reached zero
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        if state.count == 0 {
            return true;
        }
        let generation = state.generation;
        while state.generation == generation {
            if self.zero.wait_until(&mut state, deadline).timed_out() {
                return state.generation != generation;
            }
        }
        true
    }

    pub fn count(&self) -> i64 {
        self.state.lock().count
    }
}

fn misuse(err: WaitGroupError) -> WaitGroupError {
    warn!(error = %err, "WaitGroup misuse");
    err
}
