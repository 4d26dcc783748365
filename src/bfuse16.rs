//! BinaryFuse16 filters: binary fuse filters with 16-bit fingerprints.

use crate::{BinaryFuse, BinaryFuseRef};

/// A binary fuse filter with 16-bit fingerprints.
///
/// A `BinaryFuse16` takes ≈18.1 bits per key for large key sets and reports an absent key
/// present with probability ≈2^-16 (<0.002%). Small key sets pay proportionally more per key,
/// since segments are never shorter than four slots.
///
/// A filter is allocated for a key count, populated once from that many 64-bit key hashes,
/// and immutable afterwards. Population retries internally with fresh seeds. It fails with
/// [`Error::CapacityExceeded`] when the keys do not fit the allocation, and with
/// [`Error::ConstructionFailure`] if no seed within the retry budget works.
///
/// [`Error::CapacityExceeded`]: crate::Error::CapacityExceeded
/// [`Error::ConstructionFailure`]: crate::Error::ConstructionFailure
///
/// ```
/// use bfuse::{BinaryFuse16, Filter};
/// use rand::Rng;
///
/// let mut rng = rand::thread_rng();
/// let hashes: Vec<u64> = (0..250_000).map(|_| rng.gen()).collect();
///
/// let mut filter = BinaryFuse16::allocate(hashes.len()).unwrap();
/// filter.populate(&hashes).unwrap();
///
/// // Every populated hash is present.
/// assert!(hashes.iter().all(|h| filter.contains(h)));
///
/// // About one in 65536 random hashes is reported present.
/// let false_positives = (0..250_000)
///     .map(|_| rng.gen::<u64>())
///     .filter(|h| filter.contains(h))
///     .count();
/// assert!(false_positives < 20, "{} false positives", false_positives);
/// ```
///
/// Filters serialize to a flat little-endian buffer with [`to_bytes`](BinaryFuse::to_bytes);
/// `serde` and `bincode` derives are available behind the features of the same names.
pub type BinaryFuse16 = BinaryFuse<u16>;

/// A read-only [`BinaryFuse16`] borrowing its serialized form.
pub type BinaryFuse16Ref<'a> = BinaryFuseRef<'a, u16>;
