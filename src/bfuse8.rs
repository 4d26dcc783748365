//! Implements BinaryFuse8 filters.

use crate::{BinaryFuse, BinaryFuseRef};

/// A binary fuse filter with 8-bit fingerprints.
///
/// A `BinaryFuse8` uses ≈9.0 bits per entry of the set it is constructed from and has a false
/// positive rate of ≈2^-8 (<0.4%). Prefer it over a [`BinaryFuse16`] when memory matters more
/// than precision.
///
/// ```
/// use bfuse::{BinaryFuse8, Filter};
/// use core::convert::TryFrom;
///
/// let keys: Vec<u64> = (0..100_000u64)
///     .map(|i| i.wrapping_mul(0x9e37_79b9_7f4a_7c15))
///     .collect();
/// let filter = BinaryFuse8::try_from(&keys).unwrap();
///
/// assert!(keys.iter().all(|key| filter.contains(key)));
/// assert_eq!(filter.size_in_bytes(), 32 + filter.len());
/// ```
///
/// [`BinaryFuse16`]: crate::BinaryFuse16
pub type BinaryFuse8 = BinaryFuse<u8>;

/// A read-only [`BinaryFuse8`] borrowing its serialized form.
pub type BinaryFuse8Ref<'a> = BinaryFuseRef<'a, u8>;
