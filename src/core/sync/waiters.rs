/*!
 * Waiter Queues
 *
 * FIFO queue of blocked tasks, always accessed under the owning primitive's
 * state lock. Entries whose context was already claimed elsewhere (a select
 * that fired on another branch, or timed out) are skipped and discarded.
 */

use super::context::{Context, Selected, WakeResult};
use std::collections::VecDeque;
use std::sync::Arc;

/// A blocked task registered for one operation
pub struct Entry<P> {
    pub cx: Arc<Context>,
    /// Operation index reported to the task when selected
    pub oper: usize,
    /// Handoff slot shared with the task
    pub packet: P,
}

/// FIFO queue of blocked tasks
pub struct WaiterQueue<P> {
    entries: VecDeque<Entry<P>>,
}

impl<P> Default for WaiterQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> WaiterQueue<P> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn register(&mut self, cx: Arc<Context>, oper: usize, packet: P) {
        self.entries.push_back(Entry { cx, oper, packet });
    }

    /// Claim the first still-waiting entry and remove it from the queue
    ///
    /// The caller completes the handoff and then calls `entry.cx.unpark()`.
    pub fn try_select(&mut self) -> Option<Entry<P>> {
        while let Some(entry) = self.entries.pop_front() {
            if entry.cx.try_select(Selected::Operation(entry.oper)).is_ok() {
                return Some(entry);
            }
        }
        None
    }

    /// Select and wake the first still-waiting entry
    pub fn notify_one(&mut self) -> WakeResult {
        match self.try_select() {
            Some(entry) => {
                entry.cx.unpark();
                WakeResult::Woken(1)
            }
            None => WakeResult::NoWaiters,
        }
    }

    /// Select and wake every still-waiting entry
    pub fn notify_all(&mut self) -> WakeResult {
        let mut woken = 0;
        while self.notify_one().is_woken() {
            woken += 1;
        }
        WakeResult::from_count(woken)
    }

    /// Remove the entries owned by `cx`
    pub fn unregister(&mut self, cx: &Arc<Context>) {
        self.entries.retain(|entry| !Arc::ptr_eq(&entry.cx, cx));
    }

    /// Whether some task other than `cx` could be selected right now
    pub fn has_waiter_other_than(&self, cx: &Arc<Context>) -> bool {
        self.entries
            .iter()
            .any(|entry| !Arc::ptr_eq(&entry.cx, cx) && entry.cx.is_waiting())
    }

    /// Approximate number of queued tasks (for diagnostics)
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
