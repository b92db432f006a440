/*!
 * Selection Context
 *
 * One context exists per blocked task. It holds an atomic selection slot and
 * the handle needed to unpark the task. A counterpart may complete a handoff
 * to a waiter only after winning the compare-and-swap on the slot, so a task
 * registered on several queues at once (a blocked select) is completed by
 * exactly one of them.
 *
 * # Parking
 *
 * Tasks park through `parking_lot_core` keyed on the context's address. The
 * park validation re-checks the slot under the parking bucket lock, so a
 * claim that lands between the last check and the sleep is never lost.
 */

use super::config::SyncConfig;
use super::spinwait::SpinWait;
use parking_lot_core::{park, unpark_one, ParkToken, DEFAULT_UNPARK_TOKEN};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};
use std::time::Instant;

const WAITING: usize = 0;
const ABORTED: usize = 1;
const OPERATION_BASE: usize = 2;

/// State of a context's selection slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected {
    /// Not yet selected
    Waiting,
    /// The owner withdrew (timeout or a ready branch found during registration)
    Aborted,
    /// A counterpart completed or notified the operation with this index
    Operation(usize),
}

impl Selected {
    #[inline]
    fn encode(self) -> usize {
        match self {
            Selected::Waiting => WAITING,
            Selected::Aborted => ABORTED,
            Selected::Operation(i) => i + OPERATION_BASE,
        }
    }

    #[inline]
    fn decode(raw: usize) -> Self {
        match raw {
            WAITING => Selected::Waiting,
            ABORTED => Selected::Aborted,
            n => Selected::Operation(n - OPERATION_BASE),
        }
    }
}

/// Result of a wake operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
}

impl WakeResult {
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }

    pub(crate) fn from_count(n: usize) -> Self {
        if n == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(n)
        }
    }
}

/// Per-task selection slot and parking key
#[derive(Debug)]
pub struct Context {
    selected: AtomicUsize,
    owner: ThreadId,
}

impl Context {
    /// Fresh context bound to the calling task
    pub fn current() -> Self {
        Self {
            selected: AtomicUsize::new(WAITING),
            owner: thread::current().id(),
        }
    }

    /// Task that owns this context
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.owner
    }

    /// Parking key; stable while any `Arc` to the context is alive
    #[inline]
    fn key(&self) -> usize {
        self as *const Context as usize
    }

    /// Claim the slot; fails with the existing selection if already claimed
    #[inline]
    pub fn try_select(&self, sel: Selected) -> Result<(), Selected> {
        self.selected
            .compare_exchange(WAITING, sel.encode(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(Selected::decode)
    }

    #[inline]
    pub fn selected(&self) -> Selected {
        Selected::decode(self.selected.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.selected() == Selected::Waiting
    }

    /// Wake the owner after claiming the slot
    #[inline]
    pub fn unpark(&self) {
        // SAFETY: the key is this context's address, which the parked owner
        // keeps alive through its own `Arc`.
        unsafe {
            unpark_one(self.key(), |_| DEFAULT_UNPARK_TOKEN);
        }
    }

    /// Block the owning task until the slot is claimed
    ///
    /// On deadline the owner claims the slot itself with `Aborted`; if a
    /// counterpart won the race, its selection is returned instead. Never
    /// returns `Selected::Waiting`.
    pub fn wait_until(&self, deadline: Option<Instant>, config: &SyncConfig) -> Selected {
        if SpinWait::from_config(config).spin(|| !self.is_waiting()) {
            return self.selected();
        }

        loop {
            let sel = self.selected();
            if sel != Selected::Waiting {
                return sel;
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return match self.try_select(Selected::Aborted) {
                        Ok(()) => Selected::Aborted,
                        Err(sel) => sel,
                    };
                }
            }

            // SAFETY: the validate and timeout callbacks neither panic nor
            // call back into the parking lot.
            unsafe {
                park(
                    self.key(),
                    || self.is_waiting(),
                    || {},
                    |_, _| {},
                    ParkToken(0),
                    deadline,
                );
            }
        }
    }
}
