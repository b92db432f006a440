/*!
 * System Limits and Constants
 *
 * Centralized location for limits, thresholds, and tuning numbers used by the
 * coordination primitives. Organized by domain.
 *
 * ## Conventions
 * - Performance-critical constants are marked with [PERF]
 * - Values that bound memory held by a primitive are marked with [MEMORY]
 */

use std::time::Duration;

// =============================================================================
// CHANNEL LIMITS
// =============================================================================

/// Default buffer size for pool channels when the config omits one
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Largest buffer a single channel may allocate (1M slots)
/// [MEMORY] The ring buffer is allocated eagerly at creation
pub const MAX_CHANNEL_CAPACITY: usize = 1 << 20;

// =============================================================================
// SPIN / PARK TUNING
// =============================================================================

/// Spin iterations using only the CPU hint before yielding
/// [PERF] Covers handoffs that complete within a few hundred nanoseconds
pub const SPIN_HINT_ITERATIONS: u32 = 10;

/// Spin iterations that yield to the OS scheduler before sleeping
pub const SPIN_YIELD_ITERATIONS: u32 = 50;

/// Cap on a single backoff sleep during the spin phase
pub const SPIN_MAX_BACKOFF: Duration = Duration::from_micros(100);

/// Default time budget for the spin phase before parking
/// [PERF] Short enough that a blocked task costs no measurable CPU
pub const DEFAULT_SPIN_DURATION: Duration = Duration::from_micros(10);

/// Default iteration cap for the spin phase
pub const DEFAULT_MAX_SPINS: u32 = 100;

// =============================================================================
// WORKER POOL LIMITS
// =============================================================================

/// Upper bound on workers in one pool
pub const MAX_POOL_WORKERS: usize = 1024;

/// Default number of workers when the config omits one
pub const DEFAULT_POOL_WORKERS: usize = 4;

/// Default capacity of the fault-report channel
pub const DEFAULT_FAULT_CAPACITY: usize = 16;

/// Thread name prefix for pool workers
pub const WORKER_THREAD_PREFIX: &str = "taskmesh-worker";
