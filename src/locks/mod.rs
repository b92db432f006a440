/*!
 * Lock-Based Synchronization Primitives
 *
 * Mutual exclusion with per-task ownership tracking:
 * - Mutex (explicit lock/unlock, or guard-based)
 * - Reader/writer mutex with writer preference
 *
 * Misuse (unlocking what the calling task does not hold) is a reported
 * fault, never silently tolerated.
 */

mod mutex;
mod rwmutex;

// Re-export public API
pub use mutex::{Mutex, MutexGuard, RawMutex};
pub use rwmutex::{RawRwMutex, RwMutex, RwReadGuard, RwWriteGuard};
