//! Handle codec (C7): packs a pool index and an intra-pool offset into a
//! single machine word.

/// Number of bits reserved for the pool index in a [`Handle`].
///
/// 16 bits on 64-bit platforms, 8 bits on 32-bit platforms, matching
/// `POOL_INDEX_BITS` in the original allocator.
pub const INDEX_BITS: u32 = if usize::BITS == 64 { 16 } else { 8 };

/// Number of bits available to the word as a whole.
pub const WORD_BITS: u32 = usize::BITS;

/// `shift = word_bits - index_bits`: position of the index field.
pub const SHIFT: u32 = WORD_BITS - INDEX_BITS;

/// Mask selecting the offset field (the low `SHIFT` bits).
pub const OFFSET_MASK: usize = (1usize << SHIFT) - 1;

/// The largest stride a pool may request; offsets must fit in `SHIFT` bits.
pub const MAX_STRIDE: usize = 1usize << SHIFT;

/// The number of distinct registry indices, including the reserved zero
/// entry: `2^INDEX_BITS`.
pub const MAX_POOLS: usize = 1usize << INDEX_BITS;

/// An opaque, word-sized value encoding a pool index and an intra-pool
/// offset.
///
/// A `Handle` is not a pointer. It carries no lifetime and derefs to
/// nothing; the only way to turn one into memory is [`Pool::replica`]
/// (or [`PoolSet`] dispatch), which is why this type deliberately does
/// not implement `Deref` or offer any pointer-like API.
///
/// [`Pool::replica`]: crate::pool::Pool::replica
/// [`PoolSet`]: crate::pool::set::PoolSet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle(usize);

impl Handle {
    /// The handle value that can never be produced by a successful
    /// allocation (index 0 is reserved).
    pub const INVALID: Handle = Handle(0);

    /// Encodes a pool index and an intra-pool offset into a handle.
    ///
    /// `index` must be in `[1, MAX_POOLS)` and `offset` must fit in the
    /// low `SHIFT` bits; callers within this crate uphold both
    /// invariants before calling this, so it is not re-validated here.
    #[inline]
    pub(crate) const fn encode(index: u32, offset: usize) -> Handle {
        Handle(((index as usize) << SHIFT) | (offset & OFFSET_MASK))
    }

    /// Splits the handle back into its pool index and intra-pool offset.
    #[inline]
    pub(crate) const fn decode(self) -> (u32, usize) {
        ((self.0 >> SHIFT) as u32, self.0 & OFFSET_MASK)
    }

    /// The raw machine word backing this handle.
    #[inline]
    pub const fn as_raw(self) -> usize {
        self.0
    }

    /// Reconstructs a handle from a raw machine word previously obtained
    /// from [`Handle::as_raw`].
    ///
    /// Handles are not portable across processes; this is meant for
    /// round-tripping within one process, e.g. through an upper layer's
    /// own storage.
    #[inline]
    pub const fn from_raw(raw: usize) -> Handle {
        Handle(raw)
    }

    /// `true` if this is the reserved invalid value (index 0).
    #[inline]
    pub const fn is_invalid(self) -> bool {
        self.0 >> SHIFT == 0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Handle::INVALID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let h = Handle::encode(7, 4096);
        assert_eq!(h.decode(), (7, 4096));
    }

    #[test]
    fn offset_is_masked_to_shift_width() {
        let h = Handle::encode(3, OFFSET_MASK + 8);
        let (index, offset) = h.decode();
        assert_eq!(index, 3);
        assert_eq!(offset, 8);
    }

    #[test]
    fn invalid_is_index_zero() {
        assert!(Handle::INVALID.is_invalid());
        assert!(Handle::default().is_invalid());
        assert!(!Handle::encode(1, 0).is_invalid());
    }

    #[test]
    fn raw_roundtrip() {
        let h = Handle::encode(42, 128);
        assert_eq!(Handle::from_raw(h.as_raw()), h);
    }

    #[test]
    fn max_stride_fits_offset_mask() {
        assert_eq!(MAX_STRIDE - 1, OFFSET_MASK);
    }
}
