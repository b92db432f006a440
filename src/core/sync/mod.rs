/*!
 * Synchronization Substrate
 *
 * Parking and handoff machinery shared by every coordination primitive:
 * - Selection contexts with a single compare-and-swap claim per blocked task
 * - FIFO waiter queues guarded by the owning primitive's state lock
 * - Adaptive spin-then-park waiting, tuned by `SyncConfig`
 * - The probe/register/park engine used by channels and select
 *
 * # Blocking
 *
 * A blocked task consumes no CPU once its bounded spin phase ends; it parks
 * until a counterpart claims its context and unparks it.
 */

mod config;
mod context;
mod engine;
mod spinwait;
mod waiters;

pub use config::{StrategyType, SyncConfig};
pub use context::{Context, Selected, WakeResult};
pub use engine::{execute, Blocking, Operation};
pub use spinwait::SpinWait;
pub use waiters::{Entry, WaiterQueue};
