//! A high-throughput, three-tier thread-safe object pool.
//!
//! # Quick Start
//!
//! ```
//! use tierpool::{Pool, PoolConfig};
//!
//! let pool: Pool<Vec<u8>> = Pool::new(PoolConfig::default(), Vec::new).unwrap();
//! let mut buf = pool.rent();
//! buf.extend_from_slice(b"hello");
//! // When `buf` drops, the Vec goes back to the pool instead of being freed.
//! ```
//!
//! # Why three tiers?
//!
//! Under heavy rent/return traffic a single shared structure becomes the
//! bottleneck no matter how it is synchronized. This crate instead gives
//! every thread a private single-element cache (the fastest possible path,
//! requiring no atomics once warm), backs that with one bounded stack per
//! CPU (contended only by threads that happen to be scheduled on the same
//! core at the same moment), and only falls back to a single shared
//! overflow structure when both of those miss:
//!
//! 1. **Thread-local slot** — one element, owned outright by the calling
//!    thread. No locking in the uncontended case.
//! 2. **Per-core stack** — a small bounded LIFO, one per CPU, guarded by a
//!    cheap exchange-based spinlock rather than an OS mutex.
//! 3. **Global reserve** — a dynamically sized `Vec` shared by every
//!    thread, refilled and drained in batches so it is touched rarely.
//!
//! # Which pool type do I want?
//!
//! - **[`Pool<T>`]** — the general case. Supports an optional disposer run
//!   on elements the trimmer decides to release, and an optional
//!   [`PressureProbe`] to drive trim aggressiveness.
//! - **[`FastPool<T>`]** — the same engine with no disposer, for types that
//!   need no return-time cleanup.
//! - **[`ArrayPool<T>`]** — a pool of `Box<[T]>`, bucketed by exact length.
//!
//! All three hand out an RAII lease ([`Lease`], [`FastLease`], or
//! [`ArrayLease`]) that returns its value on drop and offers a `detach()`
//! escape hatch for callers that want to keep the value outside the pool's
//! lifecycle entirely.
//!
//! # Trimming
//!
//! Nothing in this crate trims itself on a timer. Call [`Pool::trim`]
//! periodically (from whatever periodic callback your application already
//! has — a GC hook, a cron-style timer, a signal handler) to let the pool
//! release elements it has not seen recently. Pass `force = true` to
//! release everything regardless of age, e.g. on process shutdown.

mod array;
mod config;
mod core;
mod error;
mod pool;
mod pressure;

pub use array::{ArrayLease, ArrayPool};
pub use config::PoolConfig;
pub use error::{Result, TierpoolError};
pub use pool::{FastLease, FastPool, Lease, Pool};
pub use pressure::{MemoryPressure, PressureProbe};

#[cfg(test)]
mod tests;
