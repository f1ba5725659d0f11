//! Builder for [`MempoolAttr`].

use std::sync::Arc;

use super::{InitFn, MempoolAttr, PoolType, DEFAULT_STRIDE};
use crate::error::{Error, Result};
use crate::handle::MAX_STRIDE;
use crate::provider::{AnonymousMmap, MemoryProvider};
use crate::utils::validate_power_of_two;

/// Builder for [`MempoolAttr`], validating all parameters in [`build`](Self::build).
pub struct MempoolAttrBuilder {
    item_size: Option<usize>,
    stride: usize,
    pool_type: PoolType,
    provider: Arc<dyn MemoryProvider>,
    init: Option<InitFn>,
    robust: bool,
    name: Option<String>,
}

impl MempoolAttrBuilder {
    /// Creates a builder with the defaults documented on [`MempoolAttr::builder`].
    pub fn new() -> Self {
        Self {
            item_size: None,
            stride: DEFAULT_STRIDE,
            pool_type: PoolType::Global,
            provider: Arc::new(AnonymousMmap),
            init: None,
            robust: false,
            name: None,
        }
    }

    /// Sets the requested item size in bytes. Required; `Pool::create`
    /// rounds this up to a power of two at least as large as a pointer.
    pub fn item_size(mut self, item_size: usize) -> Self {
        self.item_size = Some(item_size);
        self
    }

    /// Sets the byte stride between one CPU's replicas and the next.
    /// Must be a power of two no larger than [`MAX_STRIDE`].
    pub fn stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Sets the pool type: global or per-CPU with a CPU cap.
    pub fn pool_type(mut self, pool_type: PoolType) -> Self {
        self.pool_type = pool_type;
        self
    }

    /// Sets a custom memory provider, replacing the default anonymous
    /// mapping.
    pub fn provider(mut self, provider: impl MemoryProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Sets the per-CPU-strip initialization callback.
    pub fn init(mut self, init: InitFn) -> Self {
        self.init = Some(init);
        self
    }

    /// Enables or disables robust (audited) mode: a per-slot occupancy
    /// bitmap that aborts the process on double-free or leak.
    pub fn robust(mut self, robust: bool) -> Self {
        self.robust = robust;
        self
    }

    /// Sets a diagnostic name, surfaced in `tracing` fields and `Debug`
    /// output. Purely informational.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the attributes object, validating all parameters.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if `item_size` was never set, is
    /// zero, or exceeds the stride; if `stride` is not a power of two or
    /// exceeds [`MAX_STRIDE`]; or if a per-CPU pool type requests zero
    /// CPUs.
    pub fn build(self) -> Result<MempoolAttr> {
        let item_size = self
            .item_size
            .ok_or(Error::InvalidArgument { message: "item_size must be set" })?;
        if item_size == 0 {
            return Err(Error::invalid_argument("item_size must be nonzero"));
        }

        validate_power_of_two(self.stride, "stride must be a power of two")?;
        if self.stride > MAX_STRIDE {
            return Err(Error::invalid_argument("stride exceeds the maximum addressable by a handle"));
        }
        if item_size > self.stride {
            return Err(Error::invalid_argument("item_size cannot exceed stride"));
        }

        if let PoolType::PerCpu { max_cpus } = self.pool_type {
            if max_cpus == 0 {
                return Err(Error::invalid_argument("max_cpus must be at least 1"));
            }
        }

        Ok(MempoolAttr {
            item_size,
            stride: self.stride,
            pool_type: self.pool_type,
            provider: self.provider,
            init: self.init,
            robust: self.robust,
            name: self.name,
        })
    }
}

impl Default for MempoolAttrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_item_size() {
        assert!(MempoolAttrBuilder::new().build().is_err());
    }

    #[test]
    fn rejects_zero_item_size() {
        assert!(MempoolAttrBuilder::new().item_size(0).build().is_err());
    }

    #[test]
    fn rejects_non_power_of_two_stride() {
        let result = MempoolAttrBuilder::new().item_size(8).stride(3000).build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_item_size_larger_than_stride() {
        let result = MempoolAttrBuilder::new().item_size(8192).stride(4096).build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_cpu_per_cpu_pool() {
        let result = MempoolAttrBuilder::new()
            .item_size(8)
            .pool_type(PoolType::PerCpu { max_cpus: 0 })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builds_with_defaults() {
        let attrs = MempoolAttrBuilder::new().item_size(64).build().unwrap();
        assert_eq!(attrs.item_size(), 64);
        assert_eq!(attrs.stride(), DEFAULT_STRIDE);
        assert!(attrs.pool_type().is_global());
        assert!(!attrs.robust());
    }

    #[test]
    fn per_cpu_pool_type_roundtrips() {
        let attrs = MempoolAttrBuilder::new()
            .item_size(8)
            .pool_type(PoolType::PerCpu { max_cpus: 4 })
            .robust(true)
            .name("counters")
            .build()
            .unwrap();
        assert_eq!(attrs.pool_type(), PoolType::PerCpu { max_cpus: 4 });
        assert!(attrs.robust());
        assert_eq!(attrs.name(), Some("counters"));
    }
}
