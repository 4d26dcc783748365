//! This library implements Binary Fuse Filters -- static data structures for fast approximation
//! of set membership using little memory. Probabilistic filters like binary fuse filters are
//! useful for quickly estimating the existence of an entity to avoid using an expensive
//! resource, for example a disk lookup or a network round trip.
//!
//! A binary fuse filter is built once from a set of 64-bit key hashes and then answers
//! membership queries with no false negatives and a false-positive rate of about
//! `2^-fingerprint_bits`, using a little over `fingerprint_bits * 1.125` bits per key.
//! Construction peels a random 3-hypergraph and may internally retry with a new seed; queries
//! read three slots and never allocate.
//!
//! This library does not hash arbitrary types; callers hash their keys to `u64` first. Filters
//! are immutable once populated, serializable to a flat little-endian buffer, and may be
//! queried from any number of threads. The crate is `no_std` and needs an allocator.
//!
//! ```
//! use bfuse::{BinaryFuse16, Filter};
//!
//! let hashes: Vec<u64> = (0..10_000u64).map(|i| i.wrapping_mul(0x9e37_79b9_7f4a_7c15)).collect();
//!
//! let mut filter = BinaryFuse16::allocate(hashes.len()).unwrap();
//! filter.populate(&hashes).unwrap();
//!
//! assert!(hashes.iter().all(|h| filter.contains(h)));
//! assert_eq!(filter.size_in_bytes(), 32 + 2 * filter.len());
//! ```
//!
//! Filters are implemented as described in [Binary Fuse Filters: Fast and Smaller Than Xor
//! Filters] and in the [go] and [c] reference implementations.
//!
//! [Binary Fuse Filters: Fast and Smaller Than Xor Filters]: https://arxiv.org/abs/2201.01174
//! [go]: https://github.com/FastFilter/xorfilter
//! [c]: https://github.com/FastFilter/xor_singleheader

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![allow(clippy::len_without_is_empty)]

extern crate alloc;

mod bfuse;
mod bfuse16;
mod bfuse32;
mod bfuse8;
mod build;
mod error;
mod fingerprint;
mod hash;
mod layout;
mod serialize;

pub use bfuse::BinaryFuse;
pub use bfuse16::{BinaryFuse16, BinaryFuse16Ref};
pub use bfuse32::{BinaryFuse32, BinaryFuse32Ref};
pub use bfuse8::{BinaryFuse8, BinaryFuse8Ref};
pub use build::BuildConfig;
pub use error::Error;
pub use fingerprint::Fingerprint;
pub use layout::{Layout, HEADER_LEN, MAX_SEGMENT_LENGTH};
pub use serialize::BinaryFuseRef;

/// Methods common to membership filters.
pub trait Filter<Type> {
    /// Returns `true` if the filter probably contains the specified key.
    ///
    /// There can never be a false negative, but there is a small possibility of false positives.
    /// Refer to individual filters' documentation for false positive rates.
    fn contains(&self, key: &Type) -> bool;

    /// Returns the number of fingerprints in the filter.
    fn len(&self) -> usize;
}
