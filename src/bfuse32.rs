//! Implements BinaryFuse32 filters.

use crate::{BinaryFuse, BinaryFuseRef};

/// A binary fuse filter with 32-bit fingerprints: ≈36.2 bits per entry and a false positive
/// rate of ≈2^-32.
pub type BinaryFuse32 = BinaryFuse<u32>;

/// A read-only [`BinaryFuse32`] borrowing its serialized form.
pub type BinaryFuse32Ref<'a> = BinaryFuseRef<'a, u32>;
