//! Attributes object (C9): builder for pool-creation parameters.

mod builder;
mod init;
mod pool_type;

pub use builder::MempoolAttrBuilder;
pub use init::InitFn;
pub use pool_type::PoolType;

use std::sync::Arc;

use crate::provider::MemoryProvider;

/// Default stride (64 KiB), matching the reference allocator's default.
pub const DEFAULT_STRIDE: usize = 64 * 1024;

/// Pool-creation parameters, built via [`MempoolAttr::builder`].
///
/// Attributes objects are transient: `Pool::create` copies their
/// contents into the pool it creates, and the caller retains ownership
/// of the attributes afterward.
pub struct MempoolAttr {
    pub(crate) item_size: usize,
    pub(crate) stride: usize,
    pub(crate) pool_type: PoolType,
    pub(crate) provider: Arc<dyn MemoryProvider>,
    pub(crate) init: Option<InitFn>,
    pub(crate) robust: bool,
    pub(crate) name: Option<String>,
}

impl MempoolAttr {
    /// Starts building a new attributes object. Defaults: pool type
    /// global, default stride, the anonymous-mmap provider, no init
    /// callback, robust mode off, no name.
    pub fn builder() -> MempoolAttrBuilder {
        MempoolAttrBuilder::new()
    }

    /// The (pre-rounding) item size requested.
    #[inline]
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// The byte stride between one CPU's replicas and the next.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The pool type (global or per-CPU).
    #[inline]
    pub fn pool_type(&self) -> PoolType {
        self.pool_type
    }

    /// Whether robust (audited) mode is enabled.
    #[inline]
    pub fn robust(&self) -> bool {
        self.robust
    }

    /// The pool's diagnostic name, if set.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Default for MempoolAttr {
    fn default() -> Self {
        MempoolAttrBuilder::new()
            .item_size(std::mem::size_of::<usize>())
            .build()
            .expect("default attributes are always valid")
    }
}
