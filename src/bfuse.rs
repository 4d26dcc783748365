//! The binary fuse filter, generic over its fingerprint width.

use crate::{
    build::{construct, make_block, BuildConfig},
    fingerprint::Fingerprint,
    hash::mix,
    layout::Layout,
    Error, Filter,
};
use alloc::{boxed::Box, vec::Vec};
use core::convert::TryFrom;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "bincode")]
use bincode::{de::Decoder, error::DecodeError, Decode, Encode};

/// Tests a key against a filter whose slots are read through `slot`.
#[inline]
pub(crate) fn contains_with<F: Fingerprint>(
    layout: &Layout,
    seed: u64,
    key: u64,
    slot: impl Fn(usize) -> F,
) -> bool {
    let hash = mix(key, seed);
    let [h0, h1, h2] = layout.positions(hash);
    F::from_hash(hash) == slot(h0) ^ slot(h1) ^ slot(h2)
}

/// A binary fuse filter: a static approximate-membership filter over 64-bit key hashes, with
/// fingerprints of type `F` arranged in a binary-partitioned [fuse graph].
///
/// A filter is [allocated](Self::allocate) for a key count, [populated](Self::populate) from a
/// set of key hashes, and then queried through [`Filter::contains`]. A populated filter never
/// reports a populated key absent; other keys are reported present with probability about
/// `2^-F::BITS`. Queries take `&self` and may run concurrently from any number of threads.
///
/// Until a filter is populated, and after it is populated with no keys, every key is reported
/// absent.
///
/// Use the width-specific aliases [`BinaryFuse8`], [`BinaryFuse16`], and [`BinaryFuse32`].
///
/// [fuse graph]: https://arxiv.org/abs/1907.04749
/// [`BinaryFuse8`]: crate::BinaryFuse8
/// [`BinaryFuse16`]: crate::BinaryFuse16
/// [`BinaryFuse32`]: crate::BinaryFuse32
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "FilterFields<F>")
)]
#[cfg_attr(feature = "bincode", derive(Encode))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFuse<F: Fingerprint> {
    pub(crate) seed: u64,
    pub(crate) layout: Layout,
    pub(crate) fingerprints: Box<[F]>,
}

/// Filter fields as deserialized, before the slot count is checked against the layout.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct FilterFields<F> {
    seed: u64,
    layout: Layout,
    fingerprints: Box<[F]>,
}

#[cfg(feature = "serde")]
impl<F: Fingerprint> TryFrom<FilterFields<F>> for BinaryFuse<F> {
    type Error = Error;

    fn try_from(fields: FilterFields<F>) -> Result<Self, Self::Error> {
        Self::from_parts(fields.seed, fields.layout, fields.fingerprints)
    }
}

#[cfg(feature = "bincode")]
impl<Context, F: Fingerprint + Decode<Context>> Decode<Context> for BinaryFuse<F> {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let seed: u64 = Decode::decode(decoder)?;
        let layout: Layout = Decode::decode(decoder)?;
        let fingerprints: Box<[F]> = Decode::decode(decoder)?;
        Self::from_parts(seed, layout, fingerprints)
            .map_err(|_| DecodeError::Other("fingerprint count does not match the layout"))
    }
}

impl<F: Fingerprint> Filter<u64> for BinaryFuse<F> {
    /// Returns `true` if the filter probably contains the key hash. Never returns `false` for a
    /// key hash the filter was populated with.
    #[inline]
    fn contains(&self, key: &u64) -> bool {
        contains_with(&self.layout, self.seed, *key, |i| self.fingerprints[i])
    }

    fn len(&self) -> usize {
        self.fingerprints.len()
    }
}

impl<F: Fingerprint> BinaryFuse<F> {
    /// Allocates a zeroed filter sized for `size` keys.
    ///
    /// Fails with [`Error::AllocationFailure`] if the slot array cannot be addressed or
    /// allocated.
    pub fn allocate(size: usize) -> Result<Self, Error> {
        let layout = Layout::for_size(size)?;
        Ok(Self {
            seed: 0,
            layout,
            fingerprints: make_block(layout.array_length(), size)?,
        })
    }

    /// Populates the filter from a set of key hashes, replacing any previous contents.
    ///
    /// The hashes should be distinct and at most as many as the filter was allocated for;
    /// larger sets fail with [`Error::CapacityExceeded`] before any construction work.
    /// Repeated hashes are tolerated. On failure the filter is left empty.
    pub fn populate(&mut self, keys: &[u64]) -> Result<(), Error> {
        self.populate_with_config(keys, &BuildConfig::default())
    }

    /// Like [`populate`](Self::populate), with explicit construction settings.
    pub fn populate_with_config(
        &mut self,
        keys: &[u64],
        config: &BuildConfig,
    ) -> Result<(), Error> {
        self.populate_from_iter(keys.iter().copied(), config)
    }

    /// Assembles a decoded filter. Queries index the slots through `layout`, so their count must
    /// match it exactly.
    #[cfg(any(feature = "serde", feature = "bincode"))]
    fn from_parts(seed: u64, layout: Layout, fingerprints: Box<[F]>) -> Result<Self, Error> {
        let expected = layout.array_length();
        if fingerprints.len() != expected {
            return Err(Error::InvalidLength {
                expected: expected * F::BYTES,
                actual: fingerprints.len() * F::BYTES,
            });
        }
        Ok(Self {
            seed,
            layout,
            fingerprints,
        })
    }

    fn populate_from_iter<T>(&mut self, keys: T, config: &BuildConfig) -> Result<(), Error>
    where
        T: ExactSizeIterator<Item = u64> + Clone,
    {
        self.seed = construct(&self.layout, keys, &mut self.fingerprints, config)?;
        Ok(())
    }

    /// Try to construct the filter from a key iterator. Can be used directly
    /// if you don't have a contiguous array of u64 keys.
    ///
    /// Note: the iterator will be iterated over once per construction attempt. If using a hash
    /// function to map the key, it may be cheaper to create a scratch array of hashed keys.
    pub fn try_from_iterator<T>(keys: T) -> Result<Self, Error>
    where
        T: ExactSizeIterator<Item = u64> + Clone,
    {
        Self::try_from_iterator_with_config(keys, &BuildConfig::default())
    }

    /// Like [`try_from_iterator`](Self::try_from_iterator), with explicit construction settings.
    pub fn try_from_iterator_with_config<T>(keys: T, config: &BuildConfig) -> Result<Self, Error>
    where
        T: ExactSizeIterator<Item = u64> + Clone,
    {
        let mut filter = Self::allocate(keys.len())?;
        filter.populate_from_iter(keys, config)?;
        Ok(filter)
    }

    /// Size of the filter in bytes: a 32-byte header plus the fingerprint array. This is also
    /// the length of its [serialized](Self::to_bytes) form.
    #[inline]
    pub const fn size_in_bytes(&self) -> usize {
        self.layout.size_in_bytes(F::BYTES)
    }

    /// Bits of filter per key, for a filter holding `keys` keys.
    pub fn bits_per_entry(&self, keys: usize) -> f64 {
        (self.size_in_bytes() * 8) as f64 / keys as f64
    }

    /// The seed the filter was constructed with.
    #[inline]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The segment geometry of the filter.
    #[inline]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The fingerprint slots.
    #[inline]
    pub fn fingerprints(&self) -> &[F] {
        &self.fingerprints
    }
}

impl<F: Fingerprint> TryFrom<&[u64]> for BinaryFuse<F> {
    type Error = Error;

    fn try_from(keys: &[u64]) -> Result<Self, Self::Error> {
        Self::try_from_iterator(keys.iter().copied())
    }
}

impl<F: Fingerprint> TryFrom<&Vec<u64>> for BinaryFuse<F> {
    type Error = Error;

    fn try_from(v: &Vec<u64>) -> Result<Self, Self::Error> {
        Self::try_from_iterator(v.iter().copied())
    }
}

impl<F: Fingerprint> TryFrom<Vec<u64>> for BinaryFuse<F> {
    type Error = Error;

    fn try_from(v: Vec<u64>) -> Result<Self, Self::Error> {
        Self::try_from_iterator(v.iter().copied())
    }
}

#[cfg(test)]
mod test {
    use crate::{hash::murmur64, BinaryFuse, BinaryFuse16, BuildConfig, Error, Filter, Layout};
    use core::convert::TryFrom;
    use rand::Rng;

    fn hash(i: u64) -> u64 {
        murmur64(i.wrapping_add(0x5bd1_e995))
    }

    #[test]
    fn test_scenario_thousand_keys() {
        let keys: Vec<u64> = (0..1_000).map(hash).collect();
        let mut filter = BinaryFuse16::allocate(keys.len()).unwrap();
        filter.populate(&keys).unwrap();

        assert_eq!(filter.len(), 1_408);
        assert_eq!(filter.size_in_bytes(), 8 * 4 + filter.len() * 2);
        assert!(filter.contains(&hash(500)));
        for key in &keys {
            assert!(filter.contains(key));
        }

        let mut rng = rand::thread_rng();
        let false_positives = (0..100_000)
            .map(|_| rng.gen::<u64>())
            .filter(|n| filter.contains(n))
            .count();
        // 2^-16 of 100k is 1.5.
        assert!(false_positives < 15, "{} false positives", false_positives);
    }

    #[test]
    fn test_empty_filter_rejects_everything() {
        let mut filter = BinaryFuse16::allocate(0).unwrap();
        assert_eq!(filter.len(), 12);
        assert_eq!(filter.size_in_bytes(), 32 + 24);

        let mut rng = rand::thread_rng();
        let probes: Vec<u64> = (0..100_000).map(|_| rng.gen()).collect();
        assert!(probes.iter().all(|n| !filter.contains(n)));

        filter.populate(&[]).unwrap();
        assert!(probes.iter().all(|n| !filter.contains(n)));

        let filter = BinaryFuse16::try_from(&[] as &[u64]).unwrap();
        assert!(probes.iter().all(|n| !filter.contains(n)));
    }

    #[test]
    fn test_unpopulated_filter_rejects_everything() {
        let filter = BinaryFuse16::allocate(10_000).unwrap();
        assert!((0..100_000).all(|n| !filter.contains(&n)));
    }

    #[test]
    fn test_single_key() {
        let filter = BinaryFuse16::try_from(vec![42]).unwrap();
        assert!(filter.contains(&42));
        assert_eq!(filter.len(), 12);
    }

    #[test]
    fn test_repopulate() {
        let mut rng = rand::thread_rng();
        let first: Vec<u64> = (0..10_000).map(|_| rng.gen()).collect();
        let second: Vec<u64> = (0..7_500).map(|_| rng.gen()).collect();

        let mut filter = BinaryFuse16::allocate(first.len()).unwrap();
        filter.populate(&first).unwrap();
        assert!(first.iter().all(|key| filter.contains(key)));

        filter.populate(&second).unwrap();
        assert!(second.iter().all(|key| filter.contains(key)));

        filter.populate(&first).unwrap();
        assert!(first.iter().all(|key| filter.contains(key)));
    }

    #[test]
    fn test_populate_too_many_keys() {
        let mut filter = BinaryFuse16::allocate(10).unwrap();
        let keys: Vec<u64> = (0..100).collect();
        assert_eq!(
            filter.populate(&keys),
            Err(Error::CapacityExceeded {
                keys: 100,
                slots: 48
            })
        );
        assert!(keys.iter().all(|key| !filter.contains(key)));
    }

    #[test]
    fn test_populate_beyond_allocation_fails_fast() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u64> = (0..110_000).map(|_| rng.gen()).collect();
        let mut filter = BinaryFuse16::allocate(100_000).unwrap();
        assert!(keys.len() < filter.len());

        assert_eq!(
            filter.populate(&keys),
            Err(Error::CapacityExceeded {
                keys: 110_000,
                slots: filter.len()
            })
        );
        assert!(keys.iter().all(|key| !filter.contains(key)));

        filter.populate(&keys[..100_000]).unwrap();
        assert!(keys[..100_000].iter().all(|key| filter.contains(key)));
    }

    #[test]
    fn test_failed_populate_leaves_filter_empty() {
        let keys: Vec<u64> = (0..1_000).collect();
        let mut filter = BinaryFuse16::try_from(&keys).unwrap();
        assert!(filter.contains(&7));

        let config = BuildConfig::new().with_max_iterations(0);
        assert_eq!(
            filter.populate_with_config(&keys, &config),
            Err(Error::ConstructionFailure { attempts: 0 })
        );
        assert!(keys.iter().all(|key| !filter.contains(key)));
    }

    #[test]
    fn test_try_from_iterator() {
        let keys = (0..5_000usize).map(|i| hash(i as u64));
        let filter: BinaryFuse<u16> = BinaryFuse::try_from_iterator(keys.clone()).unwrap();
        assert_eq!(filter.len(), Layout::for_size(5_000).unwrap().array_length());
        assert!(keys.clone().all(|key| filter.contains(&key)));
    }

    #[test]
    fn test_filter_is_shareable_across_threads() {
        use std::{sync::Arc, thread};

        let keys: Vec<u64> = (0..100_000).map(hash).collect();
        let filter = Arc::new(BinaryFuse16::try_from(&keys).unwrap());
        let keys = Arc::new(keys);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let filter = Arc::clone(&filter);
                let keys = Arc::clone(&keys);
                thread::spawn(move || {
                    keys.iter()
                        .skip(t)
                        .step_by(4)
                        .all(|key| filter.contains(key))
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
