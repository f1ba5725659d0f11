//! Pool registry (C1): process-wide table of live pools, indexed by the
//! small integer carried in the top bits of every [`Handle`](crate::handle::Handle).

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};
use crate::handle::MAX_POOLS;
use crate::pool::PoolInner;

/// Sentinel stored in a slot between `acquire` and `publish`: reserved,
/// but not yet a valid pointer a lookup may dereference.
const RESERVED: *mut PoolInner = 1 as *mut PoolInner;

struct Registry {
    /// One entry per possible index; entry 0 is never touched (reserved).
    slots: Vec<AtomicPtr<PoolInner>>,
    /// Serialises index acquisition/release only — never held across a
    /// `malloc`/`free` on an individual pool.
    alloc_lock: Mutex<()>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Registry {
        slots: (0..MAX_POOLS).map(|_| AtomicPtr::new(ptr::null_mut())).collect(),
        alloc_lock: Mutex::new(()),
    })
}

/// Reserves the first free index in `[1, MAX_POOLS)`. The slot reads as
/// reserved-but-unpublished until [`publish`] is called.
pub(crate) fn acquire() -> Result<u32> {
    let reg = registry();
    let _guard = reg.alloc_lock.lock().unwrap_or_else(|e| e.into_inner());
    for (i, slot) in reg.slots.iter().enumerate().skip(1) {
        if slot
            .compare_exchange(ptr::null_mut(), RESERVED, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            return Ok(i as u32);
        }
    }
    Err(Error::out_of_resources("pool registry is full"))
}

/// Makes a reserved index resolvable by [`lookup`]. Must be called
/// exactly once, after [`acquire`], with the pointer that will remain
/// valid until the matching [`release`].
pub(crate) fn publish(index: u32, pool: *mut PoolInner) {
    debug_assert!(!pool.is_null());
    registry().slots[index as usize].store(pool, Ordering::Release);
}

/// Looks up the live pool behind `index`, or `None` if the index is
/// unallocated or mid-creation. Lock-free: a single atomic load.
pub(crate) fn lookup(index: u32) -> Option<*mut PoolInner> {
    if index == 0 || index as usize >= MAX_POOLS {
        return None;
    }
    match registry().slots[index as usize].load(Ordering::Acquire) {
        p if p.is_null() || p == RESERVED => None,
        p => Some(p),
    }
}

/// Releases `index` back to the free pool. The caller must have already
/// ensured no further lookups can observe a meaningful pointer (i.e.
/// this runs as part of `pool_destroy`, after the pool has stopped
/// servicing requests).
pub(crate) fn release(index: u32) {
    let reg = registry();
    let _guard = reg.alloc_lock.lock().unwrap_or_else(|e| e.into_inner());
    reg.slots[index as usize].store(ptr::null_mut(), Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_release_roundtrip() {
        let idx = acquire().unwrap();
        assert!(idx >= 1);
        assert!(lookup(idx).is_none(), "reserved but not yet published");

        let dummy = 0x1000 as *mut PoolInner;
        publish(idx, dummy);
        assert_eq!(lookup(idx), Some(dummy));

        release(idx);
        assert!(lookup(idx).is_none());
    }

    #[test]
    fn index_zero_never_resolves() {
        assert!(lookup(0).is_none());
    }

    #[test]
    fn out_of_range_index_is_none() {
        assert!(lookup(u32::MAX).is_none());
    }
}
