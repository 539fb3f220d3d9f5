//! Memory pressure classification driving trim aggressiveness.

/// Coarse memory pressure classification.
///
/// Drives how aggressively [`crate::pool::Pool::trim`] releases cached
/// objects when called without `force`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
}

/// A source of memory pressure readings, wired to whatever runtime signal
/// the host has available (a GC heap callback, cgroup limits, `/proc/meminfo`).
///
/// A pool with no registered probe treats every non-forced trim as `High`
/// pressure, the conservative default.
pub trait PressureProbe: Send + Sync {
    fn pressure(&self) -> MemoryPressure;
}

/// Per-pressure trim policy: how many elements to drop from a per-core
/// stack, the staleness thresholds for each tier, and the percentage of the
/// global reserve to release.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrimPolicy {
    pub per_core_drop_count: Option<usize>, // None means "drop all"
    pub per_core_threshold_ms: i64,
    pub thread_local_threshold_ms: i64,
    pub reserve_threshold_ms: i64,
    pub reserve_drop_fraction: f64,
}

impl TrimPolicy {
    pub(crate) fn for_pressure(pressure: MemoryPressure) -> Self {
        match pressure {
            MemoryPressure::Low => Self {
                per_core_drop_count: Some(1),
                per_core_threshold_ms: 60_000,
                thread_local_threshold_ms: 30_000,
                reserve_threshold_ms: 90_000,
                reserve_drop_fraction: 0.10,
            },
            MemoryPressure::Medium => Self {
                per_core_drop_count: Some(2),
                per_core_threshold_ms: 60_000,
                thread_local_threshold_ms: 15_000,
                reserve_threshold_ms: 45_000,
                reserve_drop_fraction: 0.30,
            },
            MemoryPressure::High => Self::forced(),
        }
    }

    pub(crate) fn forced() -> Self {
        Self {
            per_core_drop_count: None,
            per_core_threshold_ms: 0,
            thread_local_threshold_ms: 0,
            reserve_threshold_ms: 0,
            reserve_drop_fraction: 1.0,
        }
    }
}
