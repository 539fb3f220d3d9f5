//! Public pool types: [`Pool`], its RAII [`Lease`], and the disposer-free
//! [`FastPool`]/[`FastLease`] pair.

use crate::config::PoolConfig;
use crate::core::PoolEngine;
use crate::error::{Result, TierpoolError};
use crate::pressure::PressureProbe;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A process-wide, three-tier object pool for `T`.
///
/// Cloning a `Pool` is cheap (it clones the inner `Arc`) and every clone
/// shares the same tiers, so a `Pool` is usually built once and handed out
/// by reference or by clone, not rebuilt per call site.
pub struct Pool<T: Send + 'static> {
    engine: Arc<PoolEngine<T>>,
}

impl<T: Send + 'static> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self { engine: Arc::clone(&self.engine) }
    }
}

impl<T: Send + 'static> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").field("approximate_count", &self.approximate_count()).finish()
    }
}

impl<T: Send + 'static> Pool<T> {
    /// Build a pool with no disposer: returned elements are kept as-is, never
    /// given a chance to clean up before reuse.
    pub fn new(config: PoolConfig, factory: impl Fn() -> T + Send + Sync + 'static) -> Result<Self> {
        Self::build(config, factory, None, None)
    }

    /// Build a pool whose disposer runs once per element that the trimmer
    /// (or an over-capacity return) decides to release rather than reuse.
    pub fn with_disposer(
        config: PoolConfig,
        factory: impl Fn() -> T + Send + Sync + 'static,
        disposer: impl Fn(T) + Send + Sync + 'static,
    ) -> Result<Self> {
        Self::build(config, factory, Some(Box::new(disposer)), None)
    }

    /// Build a pool that also consults `probe` to choose a trim policy
    /// instead of always assuming `MemoryPressure::High`.
    pub fn with_pressure_probe(
        config: PoolConfig,
        factory: impl Fn() -> T + Send + Sync + 'static,
        disposer: Option<Box<dyn Fn(T) + Send + Sync>>,
        probe: Arc<dyn PressureProbe>,
    ) -> Result<Self> {
        Self::build(config, factory, disposer, Some(probe))
    }

    fn build(
        config: PoolConfig,
        factory: impl Fn() -> T + Send + Sync + 'static,
        disposer: Option<Box<dyn Fn(T) + Send + Sync>>,
        probe: Option<Arc<dyn PressureProbe>>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { engine: Arc::new(PoolEngine::new(config, Box::new(factory), disposer, probe)) })
    }

    /// Rent an element, synthesizing a new one with the factory if every
    /// tier is empty or contended. Panics if the factory panics.
    pub fn rent(&self) -> Lease<T> {
        Lease { value: Some(self.engine.rent()), pool: Arc::clone(&self.engine) }
    }

    /// Return `x` directly, bypassing [`Lease`]. Most callers should let a
    /// `Lease` drop instead; this exists for callers that detached one and
    /// now want to hand the value back manually.
    pub fn return_obj(&self, x: T) {
        self.engine.return_obj(x);
    }

    /// Low-level entry point accepting an optional element, for callers (like
    /// [`crate::array::ArrayPool`]) that model "nothing to return" as `None`
    /// rather than skipping the call. `None` is a caller bug, not a race.
    pub fn try_return_raw(&self, x: Option<T>) -> Result<()> {
        match x {
            Some(v) => {
                self.engine.return_obj(v);
                Ok(())
            }
            None => Err(TierpoolError::NullElement),
        }
    }

    /// Release cached elements according to the current memory pressure
    /// (or unconditionally, if `force` is true).
    pub fn trim(&self, force: bool) {
        self.engine.trim(force);
    }

    /// Best-effort total element count across all three tiers. Racy by
    /// construction — useful for metrics and tests, not for correctness.
    pub fn approximate_count(&self) -> usize {
        self.engine.approximate_count()
    }

    /// Number of threads with a still-live thread-local slot registered for
    /// this pool. Diagnostic only: a slot's liveness is tied to its owning
    /// thread, not to anything a caller can observe deterministically
    /// except by joining that thread first.
    pub fn thread_slot_count(&self) -> usize {
        self.engine.thread_slot_count()
    }

    /// Test-only seam onto the engine's `trim_with_policy`; lets a test
    /// drive the non-forced, fractional-drop trim path with thresholds it
    /// controls instead of waiting out real pressure-table timers.
    #[cfg(test)]
    pub(crate) fn trim_with_test_policy(&self, policy: crate::pressure::TrimPolicy) {
        self.engine.trim_with_policy(policy);
    }
}

impl<T: Default + Send + 'static> Pool<T> {
    /// Build a pool whose factory is `T::default`, the natural stand-in for
    /// a reflection-located zero-argument constructor.
    pub fn new_default(config: PoolConfig) -> Result<Self> {
        Self::new(config, T::default)
    }
}

/// A rented element, returned to its [`Pool`] when dropped.
pub struct Lease<T: Send + 'static> {
    value: Option<T>,
    pool: Arc<PoolEngine<T>>,
}

impl<T: Send + 'static> Lease<T> {
    /// Take the element out of the lease without returning it to the pool.
    /// The pool will synthesize a replacement on a future `rent()` instead.
    pub fn detach(mut self) -> T {
        self.value.take().expect("lease value taken exactly once")
    }
}

impl<T: Send + 'static> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().expect("lease value present until drop or detach")
    }
}

impl<T: Send + 'static> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("lease value present until drop or detach")
    }
}

impl<T: Send + 'static> fmt::Debug for Lease<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lease").field(&self.value).finish()
    }
}

impl<T: Send + 'static> Drop for Lease<T> {
    fn drop(&mut self) {
        if let Some(v) = self.value.take() {
            self.pool.return_obj(v);
        }
    }
}

/// A [`Pool`] with no disposer, for callers who never need return-time
/// cleanup and want one less closure to carry around.
///
/// This is not a distinct engine variant — it is the same [`PoolEngine`]
/// constructed with `disposer = None`, collapsing what would otherwise be a
/// separate storage-strategy dispatch into a single code path.
pub struct FastPool<T: Send + 'static> {
    inner: Pool<T>,
}

impl<T: Send + 'static> Clone for FastPool<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Send + 'static> FastPool<T> {
    pub fn new(config: PoolConfig, factory: impl Fn() -> T + Send + Sync + 'static) -> Result<Self> {
        Ok(Self { inner: Pool::new(config, factory)? })
    }

    pub fn rent(&self) -> FastLease<T> {
        FastLease { lease: self.inner.rent() }
    }

    pub fn trim(&self, force: bool) {
        self.inner.trim(force);
    }

    pub fn approximate_count(&self) -> usize {
        self.inner.approximate_count()
    }
}

impl<T: Default + Send + 'static> FastPool<T> {
    pub fn new_default(config: PoolConfig) -> Result<Self> {
        Ok(Self { inner: Pool::new_default(config)? })
    }
}

/// The [`FastPool`] counterpart to [`Lease`].
pub struct FastLease<T: Send + 'static> {
    lease: Lease<T>,
}

impl<T: Send + 'static> FastLease<T> {
    pub fn detach(self) -> T {
        self.lease.detach()
    }
}

impl<T: Send + 'static> Deref for FastLease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.lease
    }
}

impl<T: Send + 'static> DerefMut for FastLease<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.lease
    }
}
