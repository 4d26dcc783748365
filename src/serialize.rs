//! Flat serialization of binary fuse filters.
//!
//! A serialized filter is a 32-byte header followed by the fingerprint array, all
//! little-endian, with no padding and no length prefix:
//!
//! | offset | bytes | field                  |
//! |--------|-------|------------------------|
//! | 0      | 8     | `seed`                 |
//! | 8      | 8     | `segment_length`       |
//! | 16     | 8     | `segment_length_mask`  |
//! | 24     | 8     | `segment_count_length` |
//! | 32     | n * w | fingerprints           |
//!
//! The fingerprint count `n` is `segment_count_length + 2 * segment_length`.

use crate::{
    bfuse::contains_with,
    fingerprint::Fingerprint,
    layout::{Layout, HEADER_LEN},
    BinaryFuse, Error, Filter,
};
use alloc::vec::Vec;
use core::marker::PhantomData;

#[inline]
fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

/// Splits a serialized filter into seed, layout, and fingerprint body.
fn parse<F: Fingerprint>(bytes: &[u8]) -> Result<(u64, Layout, &[u8]), Error> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::BufferTooSmall {
            needed: HEADER_LEN,
            actual: bytes.len(),
        });
    }
    let seed = read_u64(bytes, 0);
    let layout = Layout::from_header(
        read_u64(bytes, 8),
        read_u64(bytes, 16),
        read_u64(bytes, 24),
    )?;

    let body = &bytes[HEADER_LEN..];
    let expected = layout.array_length() * F::BYTES;
    if body.len() != expected {
        return Err(Error::InvalidLength {
            expected,
            actual: body.len(),
        });
    }
    Ok((seed, layout, body))
}

impl<F: Fingerprint> BinaryFuse<F> {
    /// Length of the serialized filter in bytes; equal to [`size_in_bytes`](Self::size_in_bytes).
    #[inline]
    pub const fn serialized_len(&self) -> usize {
        self.size_in_bytes()
    }

    /// Serializes the filter into the front of `out`, returning the number of bytes written.
    pub fn write_to(&self, out: &mut [u8]) -> Result<usize, Error> {
        let needed = self.serialized_len();
        if out.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: out.len(),
            });
        }
        self.encode(&mut out[..needed]);
        Ok(needed)
    }

    /// Serializes the filter into a new buffer.
    ///
    /// ```
    /// use bfuse::{BinaryFuse16, Filter};
    /// use core::convert::TryFrom;
    ///
    /// let keys: Vec<u64> = (0..1_000).map(|i| i * 13).collect();
    /// let filter = BinaryFuse16::try_from(&keys).unwrap();
    ///
    /// let bytes = filter.to_bytes();
    /// assert_eq!(bytes.len(), filter.size_in_bytes());
    ///
    /// let restored = BinaryFuse16::from_bytes(&bytes).unwrap();
    /// assert!(keys.iter().all(|key| restored.contains(key)));
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = alloc::vec![0; self.serialized_len()];
        self.encode(&mut out);
        out
    }

    /// `out` is exactly `serialized_len` bytes.
    fn encode(&self, out: &mut [u8]) {
        let (header, body) = out.split_at_mut(HEADER_LEN);
        let fields = [
            self.seed,
            u64::from(self.layout.segment_length()),
            u64::from(self.layout.segment_length_mask()),
            u64::from(self.layout.segment_count_length()),
        ];
        for (chunk, field) in header.chunks_exact_mut(8).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        let chunks = body.chunks_exact_mut(F::BYTES);
        for (chunk, fingerprint) in chunks.zip(self.fingerprints.iter()) {
            fingerprint.write_le(chunk);
        }
    }

    /// Deserializes a filter, copying its fingerprints.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        BinaryFuseRef::from_bytes(bytes).map(|filter| filter.to_filter())
    }
}

/// A read-only binary fuse filter borrowing its serialized form.
///
/// Queries decode the three fingerprints they touch straight from the buffer, so a filter can
/// be used from a memory-mapped file or network buffer without copying or alignment
/// requirements.
///
/// ```
/// use bfuse::{BinaryFuse16, BinaryFuse16Ref, Filter};
/// use core::convert::TryFrom;
///
/// let keys: Vec<u64> = (0..1_000).collect();
/// let bytes = BinaryFuse16::try_from(&keys).unwrap().to_bytes();
///
/// let filter = BinaryFuse16Ref::from_bytes(&bytes).unwrap();
/// assert!(keys.iter().all(|key| filter.contains(key)));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BinaryFuseRef<'a, F: Fingerprint> {
    seed: u64,
    layout: Layout,
    fingerprints: &'a [u8],
    _fingerprint: PhantomData<F>,
}

impl<'a, F: Fingerprint> BinaryFuseRef<'a, F> {
    /// Validates and wraps a serialized filter. `bytes` must hold exactly one filter.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, Error> {
        let (seed, layout, fingerprints) = parse::<F>(bytes)?;
        Ok(Self {
            seed,
            layout,
            fingerprints,
            _fingerprint: PhantomData,
        })
    }

    /// Copies the filter into an owned [`BinaryFuse`].
    pub fn to_filter(&self) -> BinaryFuse<F> {
        BinaryFuse {
            seed: self.seed,
            layout: self.layout,
            fingerprints: self
                .fingerprints
                .chunks_exact(F::BYTES)
                .map(F::read_le)
                .collect(),
        }
    }

    /// The seed the filter was constructed with.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The segment geometry of the filter.
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Size of the serialized filter in bytes.
    pub const fn size_in_bytes(&self) -> usize {
        self.layout.size_in_bytes(F::BYTES)
    }

    #[inline]
    fn slot(&self, index: usize) -> F {
        let start = index * F::BYTES;
        F::read_le(&self.fingerprints[start..start + F::BYTES])
    }
}

impl<'a, F: Fingerprint> Filter<u64> for BinaryFuseRef<'a, F> {
    /// Returns `true` if the filter probably contains the key hash. Never returns `false` for a
    /// key hash the filter was populated with.
    #[inline]
    fn contains(&self, key: &u64) -> bool {
        contains_with(&self.layout, self.seed, *key, |i| self.slot(i))
    }

    fn len(&self) -> usize {
        self.fingerprints.len() / F::BYTES
    }
}
