/*!
 * Operation Engine
 *
 * Shared blocking loop behind every channel send/receive and every select.
 *
 * 1. **Probe**: try each operation without blocking, in a freshly shuffled
 *    order, so simultaneously ready operations are chosen uniformly.
 * 2. **Register**: enqueue one shared context on every operation. If an
 *    operation turns out ready while registering, the context aborts itself
 *    and the loop probes again.
 * 3. **Park**: sleep until a counterpart claims the context, then unregister
 *    everywhere and let the claimed operation complete its handoff.
 */

use super::config::SyncConfig;
use super::context::{Context, Selected};
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Instant;

/// One send or receive taking part in a blocking wait
pub trait Operation {
    /// Complete the operation now if it is ready
    fn try_fire(&mut self) -> bool;

    /// Enqueue `cx` as a waiter for operation index `oper`
    ///
    /// Returns true if the operation was already ready at registration time.
    fn register(&mut self, cx: &Arc<Context>, oper: usize) -> bool;

    /// Remove every waiter entry for `cx`
    fn unregister(&mut self, cx: &Arc<Context>);

    /// Finish after a counterpart selected this operation
    ///
    /// Returns false when the selection was only a wake-up (for example a
    /// close notification) and the operation must be probed again.
    fn accept(&mut self) -> bool;
}

/// How long `execute` may block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocking {
    /// Probe once, never park
    Never,
    /// Park until an operation fires or the deadline passes
    Until(Instant),
    /// Park until an operation fires
    Forever,
}

impl Blocking {
    #[inline]
    fn deadline(self) -> Option<Instant> {
        match self {
            Blocking::Until(deadline) => Some(deadline),
            _ => None,
        }
    }

    #[inline]
    fn expired(self) -> bool {
        match self {
            Blocking::Never => true,
            Blocking::Until(deadline) => Instant::now() >= deadline,
            Blocking::Forever => false,
        }
    }
}

/// Run the operations until one fires; returns its index
///
/// Returns `None` only when `blocking` is `Never` or the deadline passed.
pub fn execute<O>(ops: &mut [&mut O], blocking: Blocking, config: &SyncConfig) -> Option<usize>
where
    O: Operation + ?Sized,
{
    let mut order: Vec<usize> = (0..ops.len()).collect();
    let mut rng = rand::thread_rng();

    loop {
        order.shuffle(&mut rng);
        for &i in &order {
            if ops[i].try_fire() {
                return Some(i);
            }
        }

        if blocking.expired() {
            return None;
        }

        let cx = Arc::new(Context::current());
        let mut registered = 0;
        for &i in &order {
            registered += 1;
            if ops[i].register(&cx, i) {
                // A lost race here means a counterpart already selected us.
                let _ = cx.try_select(Selected::Aborted);
                break;
            }
        }

        let selected = cx.wait_until(blocking.deadline(), config);

        for &i in &order[..registered] {
            ops[i].unregister(&cx);
        }

        if let Selected::Operation(i) = selected {
            if ops[i].accept() {
                return Some(i);
            }
        }
    }
}
