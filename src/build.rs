//! Filter construction by peeling the 3-hypergraph that keys induce on the slot array.
// Port of the populate routine in https://github.com/FastFilter/xorfilter/blob/master/binaryfusefilter.go

use crate::{
    fingerprint::Fingerprint,
    hash::{mix, splitmix64},
    layout::Layout,
    Error,
};
use alloc::{boxed::Box, vec::Vec};
use tracing::{debug, warn};

/// Knobs for filter construction.
///
/// ```
/// use bfuse::{BinaryFuse16, BuildConfig, Filter};
///
/// let keys: Vec<u64> = (0..10_000).collect();
/// let config = BuildConfig::new().with_max_iterations(100).with_rng_state(42);
///
/// let mut filter = BinaryFuse16::allocate(keys.len()).unwrap();
/// filter.populate_with_config(&keys, &config).unwrap();
/// assert!(filter.contains(&9_999));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildConfig {
    /// Number of seeds tried before construction gives up.
    pub max_iterations: usize,
    /// Initial state of the SplitMix64 sequence seeds are drawn from. Construction is
    /// deterministic for a given key sequence and state.
    pub rng_state: u64,
}

impl BuildConfig {
    /// The default configuration: 1000 attempts, seeds drawn from state `1`.
    pub const fn new() -> Self {
        Self {
            max_iterations: 1_000,
            rng_state: 1,
        }
    }

    /// Sets the number of seeds tried.
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the initial seed generator state.
    pub const fn with_rng_state(mut self, rng_state: u64) -> Self {
        self.rng_state = rng_state;
        self
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocates a zeroed block of `len` values, reporting failure instead of aborting.
pub(crate) fn make_block<T: Clone + Default>(len: usize, size: usize) -> Result<Box<[T]>, Error> {
    let mut block = Vec::new();
    block
        .try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailure { size })?;
    block.resize(len, T::default());
    Ok(block.into_boxed_slice())
}

/// Failed attempts after which repeated keys are pruned by sorting.
const PRUNE_DUPLICATES_AFTER: usize = 10;

#[inline]
const fn mod3(x: u8) -> u8 {
    if x > 2 {
        x - 3
    } else {
        x
    }
}

/// Working state of one construction. Lives only for the duration of a `construct` call.
struct Scratch {
    size: usize,
    /// Mixed key hashes, first in segment-sorted order for insertion, then in peel order.
    /// Entry `size` is a nonzero sentinel that stops the bucketing scan.
    reverse_order: Box<[u64]>,
    /// For each peeled key, which of its three slots it was peeled from.
    reverse_h: Box<[u8]>,
    /// Per slot: key count in the upper six bits, xor of the keys' slot positions in the low two.
    t2count: Box<[u8]>,
    /// Per slot: xor of the mixed hashes of the keys touching it.
    t2hash: Box<[u64]>,
    /// Stack of slots with a single key.
    alone: Box<[u32]>,
    /// Next free index in `reverse_order` for each hash-prefix bucket.
    start_pos: Box<[usize]>,
    block_bits: u32,
    /// Keys peeled by the last successful attempt.
    peeled: usize,
}

impl Scratch {
    fn new(size: usize, layout: &Layout) -> Result<Self, Error> {
        let capacity = layout.array_length();
        let mut block_bits = 1;
        while (1 << block_bits) < layout.segment_count() {
            block_bits += 1;
        }

        let mut reverse_order: Box<[u64]> = make_block(size + 1, size)?;
        reverse_order[size] = 1;

        Ok(Self {
            size,
            reverse_order,
            reverse_h: make_block(size, size)?,
            t2count: make_block(capacity, size)?,
            t2hash: make_block(capacity, size)?,
            alone: make_block(capacity, size)?,
            start_pos: make_block(1 << block_bits, size)?,
            block_bits,
            peeled: 0,
        })
    }

    /// Adds (`add == true`) or removes a mixed hash at its three slots.
    #[inline]
    fn toggle(&mut self, slots: [usize; 3], hash: u64, add: bool) {
        for (position, &slot) in slots.iter().enumerate() {
            self.t2count[slot] = if add {
                self.t2count[slot].wrapping_add(4)
            } else {
                self.t2count[slot].wrapping_sub(4)
            };
            self.t2count[slot] ^= position as u8;
            self.t2hash[slot] ^= hash;
        }
    }

    /// Runs one peeling attempt with `seed`. Returns `true` if every key was peeled.
    ///
    /// With `prune`, the mixed hashes are fully sorted and repeats are dropped up front. Mixing
    /// is a bijection for a fixed seed, so this removes exactly the repeated keys, including
    /// those the incremental check misses because all their slots are shared.
    fn peel<I: Iterator<Item = u64>>(
        &mut self,
        layout: &Layout,
        keys: I,
        seed: u64,
        prune: bool,
    ) -> bool {
        let size = self.size;
        let block_bits = self.block_bits;
        let block_mask = (1usize << block_bits) - 1;

        // Bucket the mixed hashes by their top bits so that insertion walks the slot array
        // roughly in order.
        for (i, start) in self.start_pos.iter_mut().enumerate() {
            *start = ((i as u64 * size as u64) >> block_bits) as usize;
        }
        for key in keys {
            let hash = mix(key, seed);
            let mut segment_index = (hash >> (64 - block_bits)) as usize;
            while self.reverse_order[self.start_pos[segment_index]] != 0 {
                segment_index = (segment_index + 1) & block_mask;
            }
            self.reverse_order[self.start_pos[segment_index]] = hash;
            self.start_pos[segment_index] += 1;
        }

        if prune {
            self.reverse_order[..size].sort_unstable();
        }

        let mut overflow = false;
        let mut duplicates = 0;
        for i in 0..size {
            let hash = self.reverse_order[i];
            if prune && i > 0 && hash == self.reverse_order[i - 1] {
                duplicates += 1;
                continue;
            }
            let slots = layout.positions(hash);
            let [h0, h1, h2] = slots;
            self.toggle(slots, hash, true);

            // A repeated key cancels itself out of its slots' hash xors.
            if self.t2hash[h0] & self.t2hash[h1] & self.t2hash[h2] == 0
                && slots
                    .iter()
                    .any(|&slot| self.t2hash[slot] == 0 && self.t2count[slot] == 8)
            {
                duplicates += 1;
                self.toggle(slots, hash, false);
            }
            // Slot counts wrap after 63 keys.
            overflow |= slots.iter().any(|&slot| self.t2count[slot] < 4);
        }
        if overflow {
            return false;
        }

        let mut qsize = 0;
        for (slot, &count) in self.t2count.iter().enumerate() {
            if count >> 2 == 1 {
                self.alone[qsize] = slot as u32;
                qsize += 1;
            }
        }

        let mut stack_size = 0;
        while qsize > 0 {
            qsize -= 1;
            let index = self.alone[qsize] as usize;
            if self.t2count[index] >> 2 != 1 {
                continue;
            }

            let hash = self.t2hash[index];
            let found = self.t2count[index] & 3;
            self.reverse_h[stack_size] = found;
            self.reverse_order[stack_size] = hash;
            stack_size += 1;

            let [h0, h1, h2] = layout.positions(hash);
            let h012 = [h0, h1, h2, h0, h1];
            for step in 1..=2 {
                let other = h012[(found + step) as usize];
                if self.t2count[other] >> 2 == 2 {
                    self.alone[qsize] = other as u32;
                    qsize += 1;
                }
                self.t2count[other] = self.t2count[other].wrapping_sub(4);
                self.t2count[other] ^= mod3(found + step);
                self.t2hash[other] ^= hash;
            }
        }

        if stack_size + duplicates == size {
            if duplicates > 0 {
                debug!(duplicates, "ignored duplicate keys");
            }
            self.peeled = stack_size;
            return true;
        }
        debug!(
            peeled = stack_size,
            keys = size,
            "peeling left a non-empty core"
        );
        false
    }

    /// Clears all per-attempt state.
    fn reset(&mut self) {
        let size = self.size;
        self.reverse_order[..size].fill(0);
        self.t2count.fill(0);
        self.t2hash.fill(0);
    }

    /// Assigns fingerprints in reverse peel order so that every key's three slots xor to its
    /// fingerprint.
    fn assign<F: Fingerprint>(&self, layout: &Layout, fingerprints: &mut [F]) {
        for i in (0..self.peeled).rev() {
            let hash = self.reverse_order[i];
            let [h0, h1, h2] = layout.positions(hash);
            let h012 = [h0, h1, h2, h0, h1];
            let found = self.reverse_h[i] as usize;
            fingerprints[h012[found]] =
                F::from_hash(hash) ^ fingerprints[h012[found + 1]] ^ fingerprints[h012[found + 2]];
        }
    }
}

/// Fills `fingerprints` so that every key in `keys` is reported present, returning the seed
/// that succeeded.
///
/// `fingerprints` is zeroed first; on failure it is left zeroed, so a failed construction never
/// reports keys present. Key counts whose own layout would need more slots than `layout` has
/// are rejected up front.
pub(crate) fn construct<F, I>(
    layout: &Layout,
    keys: I,
    fingerprints: &mut [F],
    config: &BuildConfig,
) -> Result<u64, Error>
where
    F: Fingerprint,
    I: ExactSizeIterator<Item = u64> + Clone,
{
    let size = keys.len();
    let slots = layout.array_length();
    debug_assert_eq!(fingerprints.len(), slots);
    fingerprints.fill(F::default());
    // Accept at most as many keys as a filter of this array length is sized for.
    let fits = Layout::for_size(size).is_ok_and(|needed| needed.array_length() <= slots);
    if !fits {
        return Err(Error::CapacityExceeded { keys: size, slots });
    }

    let mut rng = config.rng_state;
    if size == 0 {
        return Ok(splitmix64(&mut rng));
    }

    let mut scratch = Scratch::new(size, layout)?;
    for attempt in 1..=config.max_iterations {
        let seed = splitmix64(&mut rng);
        let prune = attempt > PRUNE_DUPLICATES_AFTER;
        if scratch.peel(layout, keys.clone(), seed, prune) {
            scratch.assign(layout, fingerprints);
            debug!(attempt, keys = size, "constructed binary fuse filter");
            return Ok(seed);
        }
        scratch.reset();
    }

    warn!(
        attempts = config.max_iterations,
        keys = size,
        "giving up on binary fuse filter construction"
    );
    Err(Error::ConstructionFailure {
        attempts: config.max_iterations,
    })
}
