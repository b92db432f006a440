/*!
 * Synchronization Configuration
 *
 * Runtime configuration for how a blocked task waits: park immediately, or
 * spin with adaptive backoff for a bounded budget and then park.
 */

use crate::core::limits::{DEFAULT_MAX_SPINS, DEFAULT_SPIN_DURATION};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// Available parallelism, queried from the OS once per process
fn cpu_count() -> usize {
    static CPUS: OnceLock<usize> = OnceLock::new();
    *CPUS.get_or_init(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

/// Strategy type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    /// Park on first contention (lowest CPU use)
    Park,
    /// Bounded adaptive spin, then park (lower latency for short waits)
    SpinThenPark,
    /// Spin only when more than one CPU is available
    Auto,
}

/// Synchronization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Preferred strategy
    pub strategy: StrategyType,
    /// Spin duration before parking
    pub spin_duration: Duration,
    /// Maximum spin iterations before parking
    pub max_spins: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyType::Auto,
            spin_duration: DEFAULT_SPIN_DURATION,
            max_spins: DEFAULT_MAX_SPINS,
        }
    }
}

impl SyncConfig {
    /// Configuration optimized for low-latency handoffs (< 1ms wait expected)
    pub const fn low_latency() -> Self {
        Self {
            strategy: StrategyType::SpinThenPark,
            spin_duration: Duration::from_micros(50),
            max_spins: 500,
        }
    }

    /// Configuration optimized for long waits (> 1ms expected)
    pub const fn long_wait() -> Self {
        Self {
            strategy: StrategyType::Park,
            spin_duration: Duration::ZERO,
            max_spins: 0,
        }
    }

    /// Resolve `Auto` for the current machine
    pub fn select_strategy(&self) -> StrategyType {
        match self.strategy {
            StrategyType::Auto => {
                if cpu_count() > 1 {
                    StrategyType::SpinThenPark
                } else {
                    StrategyType::Park
                }
            }
            other => other,
        }
    }

    /// Whether a waiter should spin before parking
    #[inline]
    pub fn spins(&self) -> bool {
        self.select_strategy() == StrategyType::SpinThenPark && self.max_spins > 0
    }
}
