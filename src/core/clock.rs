//! Monotonic millisecond clock used for the trim staleness thresholds.
//!
//! A process-relative clock (rather than wall time) sidesteps clock
//! adjustments and is all the staleness comparisons in [`super::engine`]
//! need: they only ever compare two readings from this same clock.

use std::sync::OnceLock;
use std::time::Instant;

static START: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed since this process first called [`now_ms`].
pub(crate) fn now_ms() -> i64 {
    let start = *START.get_or_init(Instant::now);
    start.elapsed().as_millis() as i64
}
