//! # cls-mempool
//!
//! CPU-local storage memory-pool allocator.
//!
//! A pool reserves one contiguous virtual range sized `stride * max_cpus`
//! and hands out fixed-size slots from it. Each logical slot exists once
//! per CPU, at the same offset within every CPU's `stride`-sized strip,
//! so `malloc` returns one [`Handle`] that resolves to up to `max_cpus`
//! distinct addresses via [`pool::Pool::replica`]. `Handle` is a single
//! machine word: a registry index in the high bits, an intra-pool offset
//! in the low bits (see [`handle`]).
//!
//! ## Layout
//!
//! - [`pool::Pool`] — one pool: one virtual range, one free-list, and
//!   (in robust mode) one occupancy bitmap.
//! - [`pool::set::PoolSet`] — a sparse array of pools indexed by size
//!   class, for variable-length dispatch.
//! - [`config::MempoolAttr`] — pool-creation parameters, built via
//!   [`config::MempoolAttrBuilder`].
//! - [`provider::MemoryProvider`] — pluggable backing memory; defaults to
//!   anonymous `mmap`.
//! - [`handle::Handle`] — the encoded, non-pointer-like allocation token.
//!
//! ## Robust mode
//!
//! When [`config::MempoolAttrBuilder::robust`] is enabled, every pool
//! carries a bitmap auditing slot occupancy. A double-free or a
//! `destroy` with slots still live calls [`std::process::abort`] rather
//! than returning an `Err` — these are programmer errors, not recoverable
//! conditions.
//!
//! ## Feature flags
//!
//! - `parking_lot` (default): use `parking_lot::Mutex` instead of
//!   `std::sync::Mutex` for pool/registry/pool-set locking.
//! - `tracing`: structured logging of pool lifecycle events.
//! - `stats`: per-pool allocation statistics ([`stats`]).
//! - `serde`: `Serialize`/`Deserialize` for statistics snapshots.

#![warn(missing_docs, rust_2018_idioms)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod handle;
pub mod numa;
pub mod pool;
pub mod provider;

mod allocator;
mod registry;
mod utils;

#[cfg(feature = "stats")]
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
pub mod stats;

pub use config::{MempoolAttr, MempoolAttrBuilder, PoolType};
pub use error::{Error, Result};
pub use handle::Handle;
pub use numa::migrate_range;
pub use pool::set::PoolSet;
pub use pool::Pool;
pub use provider::{AnonymousMmap, MemoryProvider};

#[cfg(feature = "stats")]
pub use stats::{PoolStatistics, StatisticsCollector, StatisticsReporter};

/// Convenient re-exports of the commonly used types.
pub mod prelude {
    pub use crate::config::{MempoolAttr, MempoolAttrBuilder, PoolType};
    pub use crate::error::{Error, Result};
    pub use crate::handle::Handle;
    pub use crate::numa::migrate_range;
    pub use crate::pool::set::PoolSet;
    pub use crate::pool::Pool;
    pub use crate::provider::{AnonymousMmap, MemoryProvider};

    #[cfg(feature = "stats")]
    pub use crate::stats::{PoolStatistics, StatisticsCollector, StatisticsReporter};
}

/// Logs `message` (when the `tracing` feature is enabled) and aborts the
/// process. Used exclusively by robust-mode auditing, where the only
/// sound response to a detected double-free or leak is to stop before
/// more memory gets corrupted.
#[cold]
pub(crate) fn robust_abort(message: &str) -> ! {
    #[cfg(feature = "tracing")]
    tracing::error!(%message, "robust mode invariant violated, aborting");
    #[cfg(not(feature = "tracing"))]
    let _ = message;
    std::process::abort()
}
