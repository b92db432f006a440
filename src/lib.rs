/*!
 * taskmesh
 * Channel-and-lock coordination toolkit for cooperating threads
 *
 * - `channel`: typed FIFO channels, buffered or rendezvous, with one-shot close
 * - `select`: wait on several channel operations and run exactly one
 * - `locks`: Mutex and reader/writer mutex with per-task ownership checks
 * - `waitgroup`: completion counter for a group of tasks
 * - `pool`: worker pool composed from the above
 *
 * Blocking calls park the calling OS thread after a bounded adaptive spin.
 * From an async runtime, call them on its blocking pool.
 */

pub mod channel;
pub mod core;
pub mod locks;
pub mod monitoring;
pub mod pool;
pub mod select;
pub mod waitgroup;

// Re-exports
pub use crate::channel::{after, tick, Channel};
pub use crate::core::errors::*;
pub use crate::core::sync::{StrategyType, SyncConfig};
pub use locks::{Mutex, MutexGuard, RawMutex, RawRwMutex, RwMutex, RwReadGuard, RwWriteGuard};
pub use monitoring::init_tracing;
pub use pool::{PoolConfig, WorkerFault, WorkerPool};
pub use select::Select;
pub use waitgroup::WaitGroup;
