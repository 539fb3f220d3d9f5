//! [`ArrayPool`]: a pool of exact-length boxed slices, bucketed by length.

use crate::config::PoolConfig;
use crate::error::{Result, TierpoolError};
use crate::pool::Pool;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

struct ArrayPoolState<T: Send + 'static> {
    config: PoolConfig,
    buckets: Mutex<fxhash::FxHashMap<usize, Pool<Box<[T]>>>>,
}

/// A pool of `Box<[T]>`, bucketed by length: renting a length you haven't
/// rented before lazily creates a fresh [`Pool`] for that length, backed by
/// the same three-tier engine as any other `Pool<T>`.
///
/// Each bucket is looked up through a thread-local cache keyed by
/// `(TypeId::of::<T>(), pool address, length)`, the same type-erased
/// `Any`-keyed caching [`crate::core`] uses for thread-local slots, so a
/// thread that repeatedly rents the same length only takes the shared
/// buckets lock once.
pub struct ArrayPool<T: Default + Send + 'static> {
    state: Arc<ArrayPoolState<T>>,
}

impl<T: Default + Send + 'static> Clone for ArrayPool<T> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

impl<T: Default + Send + 'static> fmt::Debug for ArrayPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayPool").finish_non_exhaustive()
    }
}

thread_local! {
    static BUCKET_CACHE: RefCell<fxhash::FxHashMap<(TypeId, usize, usize), Box<dyn Any>>> =
        RefCell::new(fxhash::FxHashMap::default());
}

impl<T: Default + Send + 'static> ArrayPool<T> {
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { state: Arc::new(ArrayPoolState { config, buckets: Mutex::new(fxhash::FxHashMap::default()) }) })
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.state) as usize
    }

    fn bucket(&self, len: usize) -> Pool<Box<[T]>> {
        let key = (TypeId::of::<T>(), self.id(), len);
        BUCKET_CACHE.with(|cache| {
            let mut cache = cache.borrow_mut();
            let boxed = cache.entry(key).or_insert_with(|| {
                let mut buckets = self.state.buckets.lock().expect("bucket map mutex poisoned");
                let pool = buckets
                    .entry(len)
                    .or_insert_with(|| {
                        let config = self.state.config;
                        Pool::new(config, move || {
                            (0..len).map(|_| T::default()).collect::<Vec<_>>().into_boxed_slice()
                        })
                        .expect("bucket config already validated at ArrayPool::new")
                    })
                    .clone();
                Box::new(pool) as Box<dyn Any>
            });
            boxed
                .downcast_ref::<Pool<Box<[T]>>>()
                .expect("TypeId collision should be impossible")
                .clone()
        })
    }

    /// Rent a `Box<[T]>` of exactly `len` elements, synthesizing one filled
    /// with `T::default()` if this length's bucket has nothing cached.
    pub fn rent(&self, len: usize) -> ArrayLease<T> {
        let bucket = self.bucket(len);
        let value = bucket.rent().detach();
        ArrayLease { value: Some(value), expected_len: len, bucket }
    }

    /// Best-effort element count summed across every length bucket that has
    /// been rented from at least once.
    pub fn approximate_count(&self) -> usize {
        self.state
            .buckets
            .lock()
            .expect("bucket map mutex poisoned")
            .values()
            .map(Pool::approximate_count)
            .sum()
    }

    /// Trim every length bucket.
    pub fn trim(&self, force: bool) {
        for bucket in self.state.buckets.lock().expect("bucket map mutex poisoned").values() {
            bucket.trim(force);
        }
    }
}

/// A rented `Box<[T]>`, returned to its length bucket on drop.
///
/// If the held array's length no longer matches the bucket it was rented
/// from (only possible by assigning a different array through
/// [`DerefMut`]), [`Drop`] cannot report an error and simply discards the
/// array instead of corrupting the bucket; use [`ArrayLease::return_checked`]
/// to get a [`TierpoolError::LengthMismatch`] instead.
pub struct ArrayLease<T: Send + 'static> {
    value: Option<Box<[T]>>,
    expected_len: usize,
    bucket: Pool<Box<[T]>>,
}

impl<T: Send + 'static> ArrayLease<T> {
    /// Return the array to its bucket, or fail with
    /// [`TierpoolError::LengthMismatch`] if its length no longer matches.
    pub fn return_checked(mut self) -> Result<()> {
        let v = self.value.take().expect("lease value present until drop or return_checked");
        if v.len() != self.expected_len {
            return Err(TierpoolError::LengthMismatch { expected: self.expected_len, found: v.len() });
        }
        self.bucket
            .try_return_raw(Some(v))
            .expect("a just-taken lease value is never the null-element case");
        Ok(())
    }

    /// Take the array out without returning it to the pool.
    pub fn detach(mut self) -> Box<[T]> {
        self.value.take().expect("lease value present until drop or detach")
    }
}

impl<T: Send + 'static> Deref for ArrayLease<T> {
    type Target = Box<[T]>;

    fn deref(&self) -> &Box<[T]> {
        self.value.as_ref().expect("lease value present until drop or detach")
    }
}

impl<T: Send + 'static> DerefMut for ArrayLease<T> {
    /// Exposes the backing `Box<[T]>` itself, not just its elements, so a
    /// caller can swap it wholesale (`*lease = other_boxed_slice`). Doing so
    /// with a differently-sized box is legal Rust but makes the array no
    /// longer fit its bucket; see [`Self::return_checked`].
    fn deref_mut(&mut self) -> &mut Box<[T]> {
        self.value.as_mut().expect("lease value present until drop or detach")
    }
}

impl<T: Send + 'static> Drop for ArrayLease<T> {
    fn drop(&mut self) {
        if let Some(v) = self.value.take() {
            if v.len() == self.expected_len {
                self.bucket
                    .try_return_raw(Some(v))
                    .expect("a just-taken lease value is never the null-element case");
            } else {
                #[cfg(feature = "log")]
                log::warn!(
                    "array lease length changed from {} to {}; dropping instead of returning to pool",
                    self.expected_len,
                    v.len()
                );
            }
        }
    }
}
