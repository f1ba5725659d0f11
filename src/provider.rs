//! Memory provider (C2): reserves and releases the contiguous virtual
//! range backing a pool.

use std::ffi::c_void;
use std::ptr;

use crate::error::{Error, Result};

/// Pluggable source of the virtual memory a pool is built on.
///
/// The default provider (`AnonymousMmap`) satisfies the contract with
/// anonymous private mappings. A custom provider — backing memory with
/// a file, or with pre-faulted huge pages — must preserve the same
/// contract: `map` returns page-aligned, zero-on-first-touch memory;
/// `unmap` releases exactly what `map` returned.
pub trait MemoryProvider: Send + Sync {
    /// Reserves `len` bytes, returning the base address.
    ///
    /// `len` is always a multiple of the page size. Must return
    /// readable/writable memory that reads as zero before it is ever
    /// written (zero-on-first-touch).
    fn map(&self, len: usize) -> Result<*mut u8>;

    /// Releases the `len` bytes previously returned by `map`.
    ///
    /// `ptr`/`len` are always exactly a prior `map` return value and
    /// its length; providers do not need to support partial unmap.
    ///
    /// # Safety
    /// `ptr` must be a pointer previously returned by this provider's
    /// `map`, and no outstanding reference into that range may remain
    /// live after this call returns.
    unsafe fn unmap(&self, ptr: *mut u8, len: usize) -> Result<()>;
}

/// The system page size, queried once and cached.
pub(crate) fn page_size() -> usize {
    use std::sync::OnceLock;
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: no preconditions; `sysconf` with a fixed, valid name.
        let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if sz > 0 {
            sz as usize
        } else {
            4096
        }
    })
}

/// The default provider: anonymous, private, zero-filled virtual memory
/// from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousMmap;

impl MemoryProvider for AnonymousMmap {
    fn map(&self, len: usize) -> Result<*mut u8> {
        // SAFETY: a fixed set of flags with no caller-controlled fd/offset.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(Error::from_errno());
        }
        Ok(addr as *mut u8)
    }

    unsafe fn unmap(&self, ptr: *mut u8, len: usize) -> Result<()> {
        let rc = libc::munmap(ptr as *mut c_void, len);
        if rc != 0 {
            return Err(Error::from_errno());
        }
        Ok(())
    }
}
