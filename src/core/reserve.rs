//! The dynamically sized overflow tier.

use crossbeam_utils::Backoff;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Overflow buffer shared by every per-core stack.
///
/// Exclusive access is serialized the same way as the thread-local weak
/// registry — a single owner at a time, obtained by flipping a guard flag
/// rather than queueing on an OS mutex. A
/// [`std::sync::Mutex`] would give the same mutual exclusion; this crate
/// uses the flag-and-spin form instead so the reserve shares its locking
/// style (and the same [`Backoff`]-based spin) with [`super::per_core::PerCoreStack`]
/// rather than mixing two different lock primitives for what is, from the
/// caller's perspective, the same kind of short critical section.
pub(crate) struct GlobalReserve<T> {
    owned: AtomicBool,
    items: UnsafeCell<Vec<T>>,
    /// Timestamp of the last batch refill/spill, or `0` if none has
    /// happened since the last trim drop. Gates [`Self::should_trim`] the
    /// same way [`super::per_core::PerCoreStack`] gates on `last_nonempty_ms`.
    touched_ms: AtomicI64,
    initial_capacity: usize,
}

unsafe impl<T: Send> Send for GlobalReserve<T> {}
unsafe impl<T: Send> Sync for GlobalReserve<T> {}

pub(crate) struct Owned<'a, T> {
    reserve: &'a GlobalReserve<T>,
}

impl<'a, T> Owned<'a, T> {
    pub(crate) fn items(&mut self) -> &mut Vec<T> {
        // SAFETY: holding `Owned` implies `owned == true`, so we are the
        // reserve's sole accessor until this guard is dropped.
        unsafe { &mut *self.reserve.items.get() }
    }
}

impl<'a, T> Drop for Owned<'a, T> {
    fn drop(&mut self) {
        self.reserve.owned.store(false, Ordering::Release);
    }
}

impl<T> GlobalReserve<T> {
    pub(crate) fn new(initial_capacity: usize) -> Self {
        Self {
            owned: AtomicBool::new(false),
            items: UnsafeCell::new(Vec::with_capacity(initial_capacity)),
            touched_ms: AtomicI64::new(0),
            initial_capacity,
        }
    }

    /// Record that the reserve was just touched by a batch refill or spill.
    pub(crate) fn touch(&self) {
        self.touched_ms.store(super::clock::now_ms(), Ordering::Relaxed);
    }

    /// Whether a trim pass should drop from the reserve right now: always
    /// true when forced (`threshold_ms <= 0`), otherwise true once the
    /// reserve has sat untouched for longer than `threshold_ms`. The first
    /// call after activity just arms the timestamp, mirroring the per-core
    /// stack's hysteresis.
    pub(crate) fn should_trim(&self, now: i64, threshold_ms: i64) -> bool {
        if threshold_ms <= 0 {
            return true;
        }
        let last = self.touched_ms.load(Ordering::Relaxed);
        if last == 0 {
            self.touched_ms.store(now, Ordering::Relaxed);
            return false;
        }
        now - last > threshold_ms
    }

    /// Reset the touched timestamp after a trim pass has dropped from the
    /// reserve, so the next drop needs a fresh staleness period to elapse.
    pub(crate) fn mark_trimmed(&self) {
        self.touched_ms.store(0, Ordering::Relaxed);
    }

    pub(crate) fn approximate_count(&self) -> usize {
        // Racy by design: acquiring the lock just to report a snapshot
        // count would defeat the point of a lock-free-ish peek.
        if self.owned.load(Ordering::Relaxed) {
            0
        } else {
            // SAFETY: not holding the lock, so this is a best-effort read;
            // `Vec::len` is a single word read that cannot tear.
            unsafe { (*self.items.get()).len() }
        }
    }

    pub(crate) fn acquire(&self) -> Owned<'_, T> {
        let backoff = Backoff::new();
        while self
            .owned
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.spin();
        }
        Owned { reserve: self }
    }

    pub(crate) fn try_acquire(&self) -> Option<Owned<'_, T>> {
        self.owned
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Owned { reserve: self })
    }

    /// Grow `items` so it can hold at least `required` elements: doubles
    /// the current capacity, or grows to `required`, whichever is larger.
    pub(crate) fn ensure_capacity(items: &mut Vec<T>, required: usize) {
        if required > items.capacity() {
            let new_cap = required.max(items.capacity() * 2).max(1);
            let mut grown = Vec::with_capacity(new_cap);
            grown.append(items);
            *items = grown;
        }
    }

    /// Shrink heuristic applied during trim: if capacity is at least 4x the
    /// surviving count and more than twice the initial capacity, halve it.
    pub(crate) fn maybe_shrink(&self, items: &mut Vec<T>) {
        let cap = items.capacity();
        let remaining = items.len().max(1);
        if cap / remaining >= 4 && cap > 2 * self.initial_capacity {
            let new_cap = (cap / 2).max(self.initial_capacity);
            let mut shrunk = Vec::with_capacity(new_cap);
            shrunk.append(items);
            *items = shrunk;
        }
    }
}
