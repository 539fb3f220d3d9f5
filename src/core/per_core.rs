//! A single bounded, lock-protected LIFO stack — one per CPU.

use super::clock::now_ms;
use crossbeam_utils::Backoff;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI64, AtomicIsize, Ordering};

const LOCKED: isize = -1;

/// Outcome of a non-blocking pop attempt.
pub(crate) enum PopStatus<T> {
    Popped(T),
    Empty,
    Contended,
}

/// What a trim pass should do to this stack, decided by [`PerCoreStack::start_trim`].
pub(crate) enum TrimAction {
    Nothing,
    /// The timestamp was (re)armed; no elements were dropped.
    RefreshedTimestamp,
    /// `count` elements should be popped and disposed by the caller.
    DropCount(usize),
}

/// A fixed-capacity LIFO guarded by an exchange-based spinlock.
///
/// `state` doubles as the occupancy count *and* the lock: a thread acquires
/// exclusive access by swapping `state` to [`LOCKED`] and restores the real
/// count on release. This is the "exchange count with LOCKED" technique —
/// non-forced callers that observe [`LOCKED`] give up immediately instead of
/// spinning, which is the whole point of visiting other stacks before
/// falling back to the reserve.
pub(crate) struct PerCoreStack<T> {
    state: AtomicIsize,
    capacity: usize,
    items: UnsafeCell<Vec<T>>,
    last_nonempty_ms: AtomicI64,
}

unsafe impl<T: Send> Send for PerCoreStack<T> {}
unsafe impl<T: Send> Sync for PerCoreStack<T> {}

struct Owned<'a, T> {
    stack: &'a PerCoreStack<T>,
    /// The count observed at acquisition time; updated in place, written
    /// back to `state` on drop.
    count: usize,
}

impl<'a, T> Owned<'a, T> {
    fn items(&mut self) -> &mut Vec<T> {
        // SAFETY: holding `Owned` implies `state == LOCKED`, so we are the
        // stack's sole accessor until this guard is dropped.
        unsafe { &mut *self.stack.items.get() }
    }
}

impl<'a, T> Drop for Owned<'a, T> {
    fn drop(&mut self) {
        self.stack.state.store(self.count as isize, Ordering::Release);
    }
}

impl<T> PerCoreStack<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: AtomicIsize::new(0),
            capacity,
            items: UnsafeCell::new(Vec::with_capacity(capacity)),
            last_nonempty_ms: AtomicI64::new(0),
        }
    }

    /// Current occupancy, or `None` if another thread currently holds the lock.
    ///
    /// Used only by `approximate_count`; never synchronized against writers.
    pub(crate) fn approximate_count(&self) -> usize {
        let v = self.state.load(Ordering::Relaxed);
        if v == LOCKED { 0 } else { v as usize }
    }

    fn try_acquire(&self) -> Option<Owned<'_, T>> {
        let cur = self.state.load(Ordering::Acquire);
        if cur == LOCKED {
            return None;
        }
        match self
            .state
            .compare_exchange(cur, LOCKED, Ordering::Acquire, Ordering::Relaxed)
        {
            Ok(_) => Some(Owned { stack: self, count: cur as usize }),
            Err(_) => None,
        }
    }

    fn acquire_forced(&self) -> Owned<'_, T> {
        let backoff = Backoff::new();
        loop {
            if let Some(g) = self.try_acquire() {
                return g;
            }
            backoff.spin();
        }
    }

    /// Attempt to push `x`. Fails (returning `x` back) if the stack is full,
    /// or — when `force` is false — if another thread currently holds the lock.
    pub(crate) fn try_push(&self, x: T, force: bool) -> Result<(), T> {
        let mut guard = match self.acquire(force) {
            Some(g) => g,
            None => return Err(x),
        };
        if guard.count >= self.capacity {
            drop(guard);
            return Err(x);
        }
        let was_empty = guard.count == 0;
        guard.items().push(x);
        guard.count += 1;
        if was_empty {
            self.last_nonempty_ms.store(0, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Attempt to pop the top element.
    pub(crate) fn try_pop(&self, force: bool) -> PopStatus<T> {
        let mut guard = match self.acquire(force) {
            Some(g) => g,
            None => return PopStatus::Contended,
        };
        if guard.count == 0 {
            return PopStatus::Empty;
        }
        let v = guard.items().pop().expect("count tracked occupancy");
        guard.count -= 1;
        PopStatus::Popped(v)
    }

    fn acquire(&self, force: bool) -> Option<Owned<'_, T>> {
        if force { Some(self.acquire_forced()) } else { self.try_acquire() }
    }

    /// Decide what a trim pass should do, per the pressure-driven policy in
    /// [`crate::pressure::TrimPolicy`]. Does not itself remove or dispose
    /// anything — callers that get `DropCount(k)` must pop and dispose `k`
    /// elements themselves while still holding this stack's lock.
    pub(crate) fn start_trim(
        &self,
        now: i64,
        threshold_ms: i64,
        count_to_drop: Option<usize>,
    ) -> TrimAction {
        let guard = self.acquire_forced();
        if guard.count == 0 {
            return TrimAction::Nothing;
        }
        // threshold_ms <= 0 means "forced": skip the hysteresis entirely so
        // a single trim(true) call always drops, even on a stack that has
        // never been trimmed before.
        if threshold_ms > 0 {
            let last = self.last_nonempty_ms.load(Ordering::Relaxed);
            if last == 0 {
                self.last_nonempty_ms.store(now, Ordering::Relaxed);
                return TrimAction::RefreshedTimestamp;
            }
            if now - last <= threshold_ms {
                return TrimAction::RefreshedTimestamp;
            }
        }
        let drop_n = count_to_drop.unwrap_or(guard.count).min(guard.count);
        let new_count = guard.count.saturating_sub(drop_n);
        if new_count == 0 {
            self.last_nonempty_ms.store(0, Ordering::Relaxed);
        } else if threshold_ms > 0 {
            let last = self.last_nonempty_ms.load(Ordering::Relaxed);
            self.last_nonempty_ms.store(last + threshold_ms / 4, Ordering::Relaxed);
        }
        TrimAction::DropCount(drop_n)
    }

    /// Pop and return up to `n` elements for disposal by the trimmer. Must
    /// be called immediately after a [`TrimAction::DropCount`] decision,
    /// while no other thread can have intervened (this reacquires the lock
    /// itself, so it is safe to call standalone too).
    pub(crate) fn drain_for_trim(&self, n: usize) -> Vec<T> {
        let mut guard = self.acquire_forced();
        let take = n.min(guard.count);
        let items = guard.items();
        let drained = items.split_off(items.len() - take);
        guard.count -= take;
        drained
    }

    /// Batch-refill this stack from the reserve's tail, returning one
    /// element directly to the caller as the immediate rent result.
    ///
    /// Copies up to `min(capacity - count, reserve.len())` more elements
    /// from `reserve`'s tail into this stack.
    pub(crate) fn batch_refill(&self, reserve: &mut Vec<T>) -> Option<T> {
        let mut guard = match self.try_acquire() {
            Some(g) => g,
            None => self.acquire_forced(),
        };
        let taken = reserve.pop()?;
        let room = self.capacity.saturating_sub(guard.count);
        let n = room.min(reserve.len());
        if n > 0 {
            let moved = reserve.split_off(reserve.len() - n);
            guard.items().extend(moved);
            guard.count += n;
            if guard.count == n {
                self.last_nonempty_ms.store(0, Ordering::Relaxed);
            }
        }
        Some(taken)
    }

    /// Batch-spill this stack's entire contents into `reserve`, then append
    /// `overflow` as the final reserve entry. Leaves this stack empty.
    pub(crate) fn batch_spill(&self, reserve: &mut Vec<T>, overflow: T) {
        let mut guard = self.acquire_forced();
        reserve.append(guard.items());
        guard.count = 0;
        reserve.push(overflow);
    }
}
