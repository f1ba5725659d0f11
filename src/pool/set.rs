//! Pool set (C6): a sparse mapping from `item_order` to at most one
//! pool, routing variable-length allocations to the right size class.

#[cfg(feature = "parking_lot")]
use parking_lot::Mutex;
#[cfg(not(feature = "parking_lot"))]
use std::sync::Mutex;

use super::Pool;
use crate::error::{Error, Result};
use crate::handle::{Handle, WORD_BITS};
use crate::utils::ceil_log2;

/// `min_order`: the smallest `item_order` a pool set will dispatch to —
/// the order that first admits a machine pointer (3 on 64-bit, 2 on
/// 32-bit).
pub const MIN_ORDER: u32 = if usize::BITS == 64 { 3 } else { 2 };

struct Slot {
    pool: Option<Pool>,
}

/// A sparse array of pools indexed by `item_order`, dispatching
/// `set_malloc`/`set_zmalloc` to the smallest present pool whose
/// `item_size` can satisfy the request, retrying upward on `ENOMEM`.
pub struct PoolSet {
    /// `slots[i]` holds the pool for order `MIN_ORDER + i`, if any.
    slots: Mutex<Vec<Slot>>,
}

impl PoolSet {
    /// Creates an empty pool set.
    pub fn create() -> PoolSet {
        let num_orders = (WORD_BITS - MIN_ORDER) as usize;
        PoolSet {
            slots: Mutex::new((0..num_orders).map(|_| Slot { pool: None }).collect()),
        }
    }

    /// Adds `pool` to the set at the order implied by its `item_size`.
    /// Ownership of `pool` transfers to the set on success.
    ///
    /// # Errors
    /// `Error::InvalidArgument` if `pool.item_size()` is not itself a
    /// power of two at or above `2^MIN_ORDER`, or exceeds what this set
    /// can index. `Error::Busy` if an order already has a pool.
    pub fn add(&self, pool: Pool) -> Result<()> {
        let order = ceil_log2(pool.item_size());
        if (1usize << order) != pool.item_size() || order < MIN_ORDER {
            return Err(Error::invalid_argument(
                "pool item_size must be a power of two at least as large as a pointer",
            ));
        }
        let idx = (order - MIN_ORDER) as usize;

        #[cfg(not(feature = "parking_lot"))]
        let mut slots = self.slots.lock().unwrap();
        #[cfg(feature = "parking_lot")]
        let mut slots = self.slots.lock();

        let slot = slots.get_mut(idx).ok_or_else(|| Error::invalid_argument("order out of range for this pool set"))?;
        if slot.pool.is_some() {
            return Err(Error::Busy);
        }
        slot.pool = Some(pool);
        Ok(())
    }

    /// Picks `start = max(MIN_ORDER, ceil_log2(len))`, then scans
    /// upward for the first present pool able to serve `len` bytes,
    /// trying the next order on `ENOMEM`. The scan only holds the set
    /// mutex long enough to pick a pool; the actual malloc happens
    /// after releasing it.
    pub fn set_malloc(&self, len: usize) -> Result<Handle> {
        self.dispatch(len, Pool::malloc)
    }

    /// As [`PoolSet::set_malloc`], but zeroes the returned slot on
    /// every replica.
    pub fn set_zmalloc(&self, len: usize) -> Result<Handle> {
        self.dispatch(len, Pool::zmalloc)
    }

    fn dispatch(&self, len: usize, op: fn(&Pool) -> Result<Handle>) -> Result<Handle> {
        let start = ceil_log2(len).max(MIN_ORDER);
        let mut last_err = Error::out_of_resources("no size class in this pool set can satisfy the request");

        for order in start..WORD_BITS {
            let idx = (order - MIN_ORDER) as usize;

            // Only the scan itself holds `slots`; the pointer below is
            // dereferenced after the guard drops so a per-pool malloc
            // never serialises against other orders' lookups.
            let pool_ptr = {
                #[cfg(not(feature = "parking_lot"))]
                let slots = self.slots.lock().unwrap();
                #[cfg(feature = "parking_lot")]
                let slots = self.slots.lock();

                let Some(slot) = slots.get(idx) else { break };
                let Some(pool) = slot.pool.as_ref() else { continue };
                if pool.item_size() < len {
                    continue;
                }
                pool as *const Pool
            };

            // SAFETY: `slots`'s backing `Vec` is sized once in `create`
            // and never reallocated afterward — `add` only fills in
            // existing entries — so a contained pool's address is
            // stable for the set's lifetime. `destroy` consumes `self`
            // by value and cannot run concurrently with this call.
            match op(unsafe { &*pool_ptr }) {
                Ok(handle) => return Ok(handle),
                Err(err @ Error::OutOfResources { .. }) => {
                    last_err = err;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err)
    }

    /// Destroys every pool in the set, in index order. Stops at the
    /// first failing pool, leaving the rest of the set's pools
    /// un-destroyed rather than draining the whole set regardless of
    /// errors.
    pub fn destroy(self) -> Result<()> {
        #[cfg(not(feature = "parking_lot"))]
        let mut slots = self.slots.lock().unwrap();
        #[cfg(feature = "parking_lot")]
        let mut slots = self.slots.lock();

        for slot in slots.iter_mut() {
            if let Some(pool) = slot.pool.take() {
                pool.destroy()?;
            }
        }
        Ok(())
    }
}

impl Default for PoolSet {
    fn default() -> Self {
        Self::create()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MempoolAttr, PoolType};

    fn pool(item_size: usize) -> Pool {
        Pool::create(
            MempoolAttr::builder()
                .item_size(item_size)
                .stride(4096)
                .pool_type(PoolType::Global)
                .build()
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn dispatches_to_matching_order() {
        let set = PoolSet::create();
        set.add(pool(8)).unwrap();
        set.add(pool(64)).unwrap();

        let h = set.set_malloc(5).unwrap();
        // A request for 5 bytes should have landed in the order-8 pool,
        // not order-64.
        assert!(set.set_malloc(8).is_ok());
        let _ = h;
    }

    #[test]
    fn retries_next_order_on_exhaustion() {
        let set = PoolSet::create();
        // Tiny stride so the order-8 pool exhausts almost immediately.
        set.add(
            Pool::create(
                MempoolAttr::builder()
                    .item_size(8)
                    .stride(4096)
                    .pool_type(PoolType::Global)
                    .build()
                    .unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
        set.add(pool(16)).unwrap();

        // Exhaust the order-8 pool (4096 / 8 = 512 slots).
        for _ in 0..512 {
            set.set_malloc(8).unwrap();
        }
        // The next order-8 request should cascade to the order-16 pool.
        assert!(set.set_malloc(8).is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_item_size() {
        let set = PoolSet::create();
        let odd = Pool::create(
            MempoolAttr::builder()
                .item_size(24)
                .stride(4096)
                .pool_type(PoolType::Global)
                .build()
                .unwrap(),
        )
        .unwrap();
        // item_size rounds up to 32 inside Pool::create, which *is* a
        // power of two, so this should actually succeed; assert that.
        assert!(set.add(odd).is_ok());
    }

    #[test]
    fn duplicate_order_is_busy() {
        let set = PoolSet::create();
        set.add(pool(8)).unwrap();
        assert!(matches!(set.add(pool(8)), Err(Error::Busy)));
    }

    /// A provider whose `unmap` always fails, so `Pool::destroy` fails
    /// deterministically without needing to corrupt real mappings.
    struct FailingUnmap;

    impl crate::provider::MemoryProvider for FailingUnmap {
        fn map(&self, len: usize) -> Result<*mut u8> {
            crate::provider::AnonymousMmap.map(len)
        }

        unsafe fn unmap(&self, _ptr: *mut u8, _len: usize) -> Result<()> {
            Err(Error::invalid_argument("unmap always fails in this test provider"))
        }
    }

    #[test]
    fn destroy_stops_at_first_failure_and_leaves_later_pools_untouched() {
        let set = PoolSet::create();
        set.add(
            Pool::create(
                MempoolAttr::builder()
                    .item_size(8)
                    .stride(4096)
                    .pool_type(PoolType::Global)
                    .provider(FailingUnmap)
                    .build()
                    .unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
        set.add(pool(16)).unwrap();

        // The order-8 pool's destroy fails; destroy() must report that
        // failure immediately rather than also attempting (and
        // swallowing the result of) the order-16 pool.
        assert!(set.destroy().is_err());
    }
}
