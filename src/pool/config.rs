/*!
 * Pool Configuration
 */

use crate::core::errors::PoolError;
use crate::core::limits::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_FAULT_CAPACITY, DEFAULT_POOL_WORKERS, MAX_CHANNEL_CAPACITY,
    MAX_POOL_WORKERS,
};
use crate::core::sync::SyncConfig;
use serde::{Deserialize, Serialize};

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Label used in logs
    pub name: String,
    /// Number of worker threads
    pub workers: usize,
    /// Job channel capacity (0 = unbuffered)
    pub input_capacity: usize,
    /// Result channel capacity (0 = unbuffered)
    pub output_capacity: usize,
    /// Fault channel capacity; workers block on a full fault channel
    pub fault_capacity: usize,
    /// How pool channels wait
    pub sync: SyncConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "pool".to_string(),
            workers: DEFAULT_POOL_WORKERS,
            input_capacity: DEFAULT_CHANNEL_CAPACITY,
            output_capacity: DEFAULT_CHANNEL_CAPACITY,
            fault_capacity: DEFAULT_FAULT_CAPACITY,
            sync: SyncConfig::default(),
        }
    }
}

impl PoolConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_capacities(mut self, input: usize, output: usize) -> Self {
        self.input_capacity = input;
        self.output_capacity = output;
        self
    }

    pub fn with_fault_capacity(mut self, capacity: usize) -> Self {
        self.fault_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.workers == 0 {
            return Err(PoolError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.workers > MAX_POOL_WORKERS {
            return Err(PoolError::InvalidConfig(format!(
                "workers {} exceeds limit {}",
                self.workers, MAX_POOL_WORKERS
            )));
        }
        for (label, capacity) in [
            ("input_capacity", self.input_capacity),
            ("output_capacity", self.output_capacity),
            ("fault_capacity", self.fault_capacity),
        ] {
            if capacity > MAX_CHANNEL_CAPACITY {
                return Err(PoolError::InvalidConfig(format!(
                    "{} {} exceeds limit {}",
                    label, capacity, MAX_CHANNEL_CAPACITY
                )));
            }
        }
        Ok(())
    }
}
