//! Pool (C5): owns one virtual range, one free-list, one bitmap, one
//! mutex; implements slot allocate/free; exposes its registry index.

pub mod set;

use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "parking_lot")]
use parking_lot::Mutex;
#[cfg(not(feature = "parking_lot"))]
use std::sync::Mutex;

use crate::allocator::{Bitmap, FreeList};
use crate::config::MempoolAttr;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::provider::{page_size, MemoryProvider};
use crate::registry;
use crate::utils::{align_up, log2_exact};

#[cfg(feature = "stats")]
use crate::stats::{PoolStatistics, StatisticsCollector};

struct PoolState {
    /// Offset of the next never-yet-used slot.
    bump: usize,
    free_list: FreeList,
    /// `Some` only in robust mode.
    bitmap: Option<Bitmap>,
}

/// The heap-resident pool state. Addressed both by the owning [`Pool`]
/// and, via a raw pointer, by the pool registry — see `src/registry.rs`.
pub(crate) struct PoolInner {
    index: u32,
    base: *mut u8,
    stride: usize,
    max_cpus: usize,
    item_size: usize,
    item_order: u32,
    robust: bool,
    name: Option<String>,
    provider: Arc<dyn MemoryProvider>,
    destroyed: AtomicBool,
    state: Mutex<PoolState>,
    #[cfg(feature = "stats")]
    stats: Mutex<StatisticsCollector>,
}

// SAFETY: all mutable access to `PoolInner` goes through `state` (and
// `stats`), both mutex-guarded; `base`/`stride`/etc. are set once at
// creation and never mutated afterward.
unsafe impl Send for PoolInner {}
unsafe impl Sync for PoolInner {}

impl PoolInner {
    fn malloc_offset(&self) -> Result<usize> {
        #[cfg(not(feature = "parking_lot"))]
        let mut state = self.state.lock().unwrap();
        #[cfg(feature = "parking_lot")]
        let mut state = self.state.lock();

        let offset = if let Some(node) = unsafe { state.free_list.pop() } {
            node as usize - self.base as usize
        } else if state.bump + self.item_size <= self.stride {
            let offset = state.bump;
            state.bump += self.item_size;
            offset
        } else {
            #[cfg(feature = "stats")]
            {
                #[cfg(not(feature = "parking_lot"))]
                self.stats.lock().unwrap().record_failure();
                #[cfg(feature = "parking_lot")]
                self.stats.lock().record_failure();
            }
            #[cfg(feature = "tracing")]
            tracing::warn!(index = self.index, name = ?self.name, "pool exhausted");
            return Err(Error::out_of_resources("pool has no free slots"));
        };

        if let Some(bitmap) = state.bitmap.as_mut() {
            bitmap.mark_live(offset >> self.item_order);
        }

        #[cfg(feature = "stats")]
        {
            #[cfg(not(feature = "parking_lot"))]
            self.stats.lock().unwrap().record_malloc();
            #[cfg(feature = "parking_lot")]
            self.stats.lock().record_malloc();
        }

        Ok(offset)
    }

    fn free_offset(&self, offset: usize) -> Result<()> {
        #[cfg(not(feature = "parking_lot"))]
        let mut state = self.state.lock().unwrap();
        #[cfg(feature = "parking_lot")]
        let mut state = self.state.lock();

        if let Some(bitmap) = state.bitmap.as_mut() {
            bitmap.mark_free(offset >> self.item_order);
        }

        // SAFETY: `offset` was handed out by `malloc_offset` and is not
        // currently chained anywhere else; replica 0 is always mapped.
        let replica0 = unsafe { self.base.add(offset) };
        unsafe {
            state.free_list.push(replica0);
        }

        #[cfg(feature = "stats")]
        {
            #[cfg(not(feature = "parking_lot"))]
            self.stats.lock().unwrap().record_free();
            #[cfg(feature = "parking_lot")]
            self.stats.lock().record_free();
        }

        Ok(())
    }

    fn replica_addr(&self, cpu: usize, offset: usize) -> Result<*mut u8> {
        if cpu >= self.max_cpus {
            return Err(Error::invalid_argument("cpu index out of range for this pool"));
        }
        // SAFETY: pure arithmetic within the pool's mapped range.
        Ok(unsafe { self.base.add(cpu * self.stride + offset) })
    }

    /// Idempotent teardown shared by `Pool::destroy` and `Pool::drop`.
    fn teardown(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if self.robust {
            #[cfg(not(feature = "parking_lot"))]
            let state = self.state.lock().unwrap();
            #[cfg(feature = "parking_lot")]
            let state = self.state.lock();

            if let Some(bitmap) = state.bitmap.as_ref() {
                if !bitmap.is_all_clear() {
                    crate::robust_abort("pool destroyed with live slots outstanding");
                }
            }
        }

        // SAFETY: `base` was returned by this same provider's `map` for
        // exactly `stride * max_cpus` bytes, and no replica/handle may
        // outlive this call per spec.
        let result = unsafe { self.provider.unmap(self.base, self.stride * self.max_cpus) };

        registry::release(self.index);

        #[cfg(feature = "tracing")]
        tracing::debug!(index = self.index, name = ?self.name, "pool destroyed");

        result
    }
}

/// A CPU-local memory pool: fixed-size slots replicated across up to
/// `max_cpus` CPUs, backed by one contiguous virtual range.
pub struct Pool {
    inner: Box<PoolInner>,
}

impl Pool {
    /// Creates a pool from the given attributes.
    ///
    /// Rounds `item_size` up to a power of two at least as large as a
    /// pointer, page-aligns `stride`, reserves a registry index, maps
    /// the backing memory, optionally builds the occupancy bitmap
    /// (robust mode), and runs the init callback once per CPU strip.
    pub fn create(attrs: MempoolAttr) -> Result<Pool> {
        let item_size = attrs.item_size.next_power_of_two().max(std::mem::size_of::<usize>());
        let item_order = log2_exact(item_size);
        let stride = align_up(attrs.stride.max(item_size), page_size());
        if item_size > stride {
            return Err(Error::invalid_argument("item_size cannot exceed the page-aligned stride"));
        }
        let max_cpus = attrs.pool_type.max_cpus();
        let len = stride
            .checked_mul(max_cpus)
            .ok_or_else(|| Error::invalid_argument("stride * max_cpus overflows"))?;

        let index = registry::acquire()?;

        let base = match attrs.provider.map(len) {
            Ok(base) => base,
            Err(err) => {
                registry::release(index);
                return Err(err);
            }
        };

        let bitmap = attrs.robust.then(|| Bitmap::new(stride / item_size));

        if let Some(init) = &attrs.init {
            for cpu in 0..max_cpus {
                // SAFETY: `base + cpu * stride` is within the just-mapped range.
                let strip = unsafe { base.add(cpu * stride) };
                init(strip, stride, cpu as i32);
            }
        }

        let inner = Box::new(PoolInner {
            index,
            base,
            stride,
            max_cpus,
            item_size,
            item_order,
            robust: attrs.robust,
            name: attrs.name.clone(),
            provider: attrs.provider.clone(),
            destroyed: AtomicBool::new(false),
            state: Mutex::new(PoolState {
                bump: 0,
                free_list: FreeList::new(),
                bitmap,
            }),
            #[cfg(feature = "stats")]
            stats: Mutex::new(StatisticsCollector::new(stride / item_size)),
        });

        // The registry gets a raw alias of the same allocation `inner`
        // owns; it is only ever dereferenced for shared (`&PoolInner`)
        // access, so this does not conflict with `Pool`'s ownership.
        let raw = inner.as_ref() as *const PoolInner as *mut PoolInner;
        registry::publish(index, raw);

        #[cfg(feature = "tracing")]
        tracing::debug!(index, name = ?inner.name, stride, max_cpus, item_size, "pool created");

        Ok(Pool { inner })
    }

    /// This pool's registry index.
    #[inline]
    pub fn index(&self) -> u32 {
        self.inner.index
    }

    /// The rounded item size in bytes.
    #[inline]
    pub fn item_size(&self) -> usize {
        self.inner.item_size
    }

    /// The page-aligned stride between one CPU's replicas and the next.
    #[inline]
    pub fn stride(&self) -> usize {
        self.inner.stride
    }

    /// The number of CPU replicas this pool's range is sized for.
    #[inline]
    pub fn max_cpus(&self) -> usize {
        self.inner.max_cpus
    }

    /// Whether robust (audited) mode is enabled.
    #[inline]
    pub fn is_robust(&self) -> bool {
        self.inner.robust
    }

    /// The pool's diagnostic name, if set.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Allocates one slot, returning an encoded handle. The returned
    /// memory is *not* zeroed.
    pub fn malloc(&self) -> Result<Handle> {
        let offset = self.inner.malloc_offset()?;
        Ok(Handle::encode(self.inner.index, offset))
    }

    /// Allocates one slot and zeroes it on every CPU replica. The
    /// zeroing loop runs outside the pool's mutex.
    pub fn zmalloc(&self) -> Result<Handle> {
        let offset = self.inner.malloc_offset()?;
        for cpu in 0..self.inner.max_cpus {
            // SAFETY: `cpu < max_cpus` and `offset + item_size <= stride`.
            let p = unsafe { self.inner.base.add(cpu * self.inner.stride + offset) };
            unsafe { ptr::write_bytes(p, 0, self.inner.item_size) };
        }
        Ok(Handle::encode(self.inner.index, offset))
    }

    /// Returns `handle`'s slot to this pool's free list.
    pub fn free(&self, handle: Handle) -> Result<()> {
        let (index, offset) = handle.decode();
        debug_assert_eq!(index, self.inner.index, "handle belongs to a different pool");
        self.inner.free_offset(offset)
    }

    /// Computes the address of `handle`'s replica on `cpu`. Pure
    /// arithmetic, no lock.
    pub fn replica(&self, handle: Handle, cpu: usize) -> Result<*mut u8> {
        let (index, offset) = handle.decode();
        debug_assert_eq!(index, self.inner.index, "handle belongs to a different pool");
        self.inner.replica_addr(cpu, offset)
    }

    /// Migrates each CPU's strip to that CPU's NUMA node. See
    /// [`crate::numa`].
    pub fn init_numa(&self, flags: i32) -> Result<()> {
        crate::numa::migrate_strips(self.inner.base, self.inner.stride, self.inner.max_cpus, flags)
    }

    /// `malloc` restricted to global (`max_cpus == 1`) pools — a
    /// convenience alias with no behavioral difference from `malloc`.
    pub fn malloc_global(&self) -> Result<Handle> {
        assert_eq!(self.inner.max_cpus, 1, "malloc_global called on a per-CPU pool");
        self.malloc()
    }

    /// `zmalloc` restricted to global pools.
    pub fn zmalloc_global(&self) -> Result<Handle> {
        assert_eq!(self.inner.max_cpus, 1, "zmalloc_global called on a per-CPU pool");
        self.zmalloc()
    }

    /// `free` restricted to global pools.
    pub fn free_global(&self, handle: Handle) -> Result<()> {
        assert_eq!(self.inner.max_cpus, 1, "free_global called on a per-CPU pool");
        self.free(handle)
    }

    /// A snapshot of this pool's allocation statistics.
    #[cfg(feature = "stats")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn statistics(&self) -> PoolStatistics {
        #[cfg(not(feature = "parking_lot"))]
        let stats = self.inner.stats.lock().unwrap();
        #[cfg(feature = "parking_lot")]
        let stats = self.inner.stats.lock();
        stats.snapshot()
    }

    /// Destroys the pool: unmaps its memory and releases its registry
    /// index. In robust mode, aborts the process if any slot is still
    /// live (a leak).
    ///
    /// Any handle drawn from this pool is undefined to use afterward.
    pub fn destroy(self) -> Result<()> {
        self.inner.teardown()
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        let _ = self.inner.teardown();
    }
}

/// Returns `handle`'s slot to the pool named by its own encoded index,
/// without the caller needing to hold that pool's `Pool` value.
///
/// This is the primitive upper layers that only keep `Handle`s (not
/// live `Pool` references) build on.
pub fn free(handle: Handle) -> Result<()> {
    let (index, offset) = handle.decode();
    let raw = registry::lookup(index).ok_or(Error::NotFound)?;
    // SAFETY: the registry only resolves indices of currently-live
    // pools; caller must not race this against that pool's `destroy`.
    let inner = unsafe { &*raw };
    inner.free_offset(offset)
}

/// Computes the address of `handle`'s replica on `cpu`, resolving the
/// owning pool purely from the handle's encoded index.
pub fn replica(handle: Handle, cpu: usize) -> Result<*mut u8> {
    let (index, offset) = handle.decode();
    let raw = registry::lookup(index).ok_or(Error::NotFound)?;
    // SAFETY: see `free` above.
    let inner = unsafe { &*raw };
    inner.replica_addr(cpu, offset)
}
