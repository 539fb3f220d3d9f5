//! Per-thread single-element cache, plus the process-wide weak registry the
//! trimmer uses to reach every live slot regardless of which thread owns it.

use super::clock::now_ms;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// The data behind a [`ThreadLocalSlot`] handle.
///
/// Lives in `Arc`, strong-owned by the thread-local map in [`thread_slot`];
/// the pool's registry only ever holds a [`Weak`] to it. When the owning
/// thread exits, its thread-local storage drops, the `Arc`'s strong count
/// hits zero, and every `Weak` in the registry starts upgrading to `None`,
/// with no epoch or index bookkeeping needed because `Arc`/`Weak` already
/// provide exactly that reclamation semantics.
///
/// A dying thread's drop glue runs with nobody else able to observe this
/// slot (the registry only ever held a `Weak`, and that `Weak` is about to
/// start failing to upgrade), so a value still cached here when the thread
/// exits would otherwise just vanish through ordinary `Drop` — silently
/// skipping the pool's own disposer hook. `SlotInner` carries a clone of
/// that hook for exactly this case; see its `Drop` impl below.
pub(crate) struct SlotInner<T> {
    value: Mutex<Option<T>>,
    last_seen_ms: AtomicI64,
    disposer: Option<Arc<dyn Fn(T) + Send + Sync>>,
}

impl<T> SlotInner<T> {
    fn new(disposer: Option<Arc<dyn Fn(T) + Send + Sync>>) -> Self {
        Self { value: Mutex::new(None), last_seen_ms: AtomicI64::new(now_ms()), disposer }
    }
}

impl<T> Drop for SlotInner<T> {
    fn drop(&mut self) {
        if let Some(v) = self.value.get_mut().expect("slot mutex poisoned").take() {
            if let Some(d) = &self.disposer {
                d(v);
            }
        }
    }
}

/// Handle to the calling thread's single-element cache for one pool.
pub(crate) struct ThreadLocalSlot<T: Send + 'static> {
    inner: Arc<SlotInner<T>>,
}

impl<T: Send + 'static> ThreadLocalSlot<T> {
    /// Take the cached element, if present. A lock held by the trimmer
    /// (which only ever holds it briefly) is treated the same as empty.
    pub(crate) fn rent(&self) -> Option<T> {
        let mut guard = self.inner.value.try_lock().ok()?;
        self.inner.last_seen_ms.store(now_ms(), Ordering::Relaxed);
        guard.take()
    }

    /// Place `x`, returning whatever was previously cached (which the
    /// caller must push into the per-core tier). If the slot is momentarily
    /// held by the trimmer, `x` is handed straight back so the caller can
    /// fall through to the per-core tier instead.
    pub(crate) fn return_obj(&self, x: T) -> Option<T> {
        match self.inner.value.try_lock() {
            Ok(mut guard) => {
                self.inner.last_seen_ms.store(now_ms(), Ordering::Relaxed);
                guard.replace(x)
            }
            Err(_) => Some(x),
        }
    }
}

/// Registry of weak references to every [`SlotInner`] a pool has ever
/// created, one per thread that has touched the pool.
pub(crate) struct SlotRegistry<T> {
    slots: Mutex<Vec<Weak<SlotInner<T>>>>,
}

impl<T> SlotRegistry<T> {
    pub(crate) fn new() -> Self {
        Self { slots: Mutex::new(Vec::new()) }
    }

    fn register(&self, weak: Weak<SlotInner<T>>) {
        self.slots.lock().expect("registry mutex poisoned").push(weak);
    }

    /// Number of registry entries whose slot is still alive. Backs
    /// [`super::engine::PoolEngine::thread_slot_count`], a diagnostic/test
    /// hook; walking for trim is done by [`Self::for_each_live`], which
    /// also prunes dead entries as it goes.
    pub(crate) fn live_count(&self) -> usize {
        self.slots
            .lock()
            .expect("registry mutex poisoned")
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Visit every still-live slot, pruning dead weak references as it goes.
    pub(crate) fn for_each_live(&self, mut f: impl FnMut(&SlotInner<T>)) {
        let mut slots = self.slots.lock().expect("registry mutex poisoned");
        slots.retain(|weak| match weak.upgrade() {
            Some(strong) => {
                f(&strong);
                true
            }
            None => false,
        });
    }

    /// Number of live slots that currently hold a cached element — the L1
    /// tier's contribution to [`super::engine::PoolEngine::approximate_count`].
    /// Best-effort like the rest of that count: a slot momentarily held by
    /// its owning thread (or by a concurrent trim) is skipped rather than
    /// waited on, same as the per-core and reserve tiers' own racy peeks.
    pub(crate) fn approximate_present_count(&self) -> usize {
        let mut slots = self.slots.lock().expect("registry mutex poisoned");
        let mut present = 0;
        slots.retain(|weak| match weak.upgrade() {
            Some(strong) => {
                if let Ok(guard) = strong.value.try_lock() {
                    if guard.is_some() {
                        present += 1;
                    }
                }
                true
            }
            None => false,
        });
        present
    }
}

thread_local! {
    static SLOTS: RefCell<fxhash::FxHashMap<(TypeId, usize), Box<dyn Any>>> =
        RefCell::new(fxhash::FxHashMap::default());
}

/// Fetch (or lazily create and register) this thread's slot for the pool
/// identified by `pool_id` — the address of the pool's engine, stable for
/// its lifetime. Keyed additionally by `TypeId::of::<T>()` so that a freed
/// pool's address being reused by a pool of a different element type can
/// never collide with a stale thread-local entry. One physical thread-local
/// map backs every pool instance in the process, mirroring the type-erased
/// `Opaque`/`Any` pattern used for per-type thread-local pools elsewhere in
/// this crate's ancestry.
pub(crate) fn thread_slot<T: Send + 'static>(
    pool_id: usize,
    registry: &SlotRegistry<T>,
    disposer: Option<&Arc<dyn Fn(T) + Send + Sync>>,
) -> ThreadLocalSlot<T> {
    SLOTS.with(|slots| {
        let mut slots = slots.borrow_mut();
        let key = (TypeId::of::<T>(), pool_id);
        let boxed = slots.entry(key).or_insert_with(|| {
            let inner = Arc::new(SlotInner::<T>::new(disposer.cloned()));
            registry.register(Arc::downgrade(&inner));
            Box::new(inner) as Box<dyn Any>
        });
        let inner = boxed
            .downcast_ref::<Arc<SlotInner<T>>>()
            .expect("TypeId collision should be impossible")
            .clone();
        ThreadLocalSlot { inner }
    })
}

/// Trim support: dispose this slot's value if it has gone stale past
/// `threshold_ms`, or unconditionally if forced (`threshold_ms <= 0`).
pub(crate) fn trim_slot<T>(slot: &SlotInner<T>, now: i64, threshold_ms: i64, mut dispose: impl FnMut(T)) {
    let last = slot.last_seen_ms.load(Ordering::Relaxed);
    if threshold_ms > 0 && now - last <= threshold_ms {
        return;
    }
    if let Ok(mut guard) = slot.value.try_lock() {
        if let Some(v) = guard.take() {
            dispose(v);
        }
    }
}
