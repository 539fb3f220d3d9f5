//! Current-CPU probe used only for locality of the per-core stack walk.
//!
//! Correctness never depends on this returning an accurate or even stable
//! value — the pool is correct for any starting index — it only biases the
//! round-robin walk toward whichever stack a thread most recently touched.

#[cfg(target_os = "linux")]
pub(crate) fn current_processor_id() -> usize {
    let cpu = unsafe { libc::sched_getcpu() };
    if cpu < 0 { thread_id_fallback() } else { cpu as usize }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn current_processor_id() -> usize {
    thread_id_fallback()
}

fn thread_id_fallback() -> usize {
    use std::hash::{Hash, Hasher};
    let mut hasher = fxhash::FxHasher::default();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish() as usize
}
