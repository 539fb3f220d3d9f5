//! Tunable capacities for a pool's three tiers.

use crate::error::{Result, TierpoolError};

/// Capacity knobs for the three tiers a [`crate::pool::Pool`] is built from.
///
/// The defaults match the reference sizing: 128 slots per per-core stack,
/// 256 initial slots in the global reserve, and one per-core stack per CPU
/// (capped at 64).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Capacity `C` of each per-core stack.
    pub per_core_capacity: usize,
    /// Initial capacity of the global reserve.
    pub reserve_initial_capacity: usize,
    /// Number of per-core stacks `P`. Defaults to `min(available_parallelism, 64)`.
    pub per_core_stacks: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            per_core_capacity: 128,
            reserve_initial_capacity: 256,
            per_core_stacks: default_stack_count(),
        }
    }
}

impl PoolConfig {
    /// Validate the configuration, returning the first out-of-range field.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.per_core_capacity == 0 {
            return Err(TierpoolError::InvalidCapacity {
                what: "per_core_capacity",
                value: self.per_core_capacity,
            });
        }
        if self.reserve_initial_capacity == 0 {
            return Err(TierpoolError::InvalidCapacity {
                what: "reserve_initial_capacity",
                value: self.reserve_initial_capacity,
            });
        }
        if self.per_core_stacks == 0 {
            return Err(TierpoolError::InvalidCapacity {
                what: "per_core_stacks",
                value: self.per_core_stacks,
            });
        }
        Ok(())
    }
}

fn default_stack_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(64)
}
