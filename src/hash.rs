//! Hash mixing used to place keys and to derive construction seeds.

/// The 64-bit finalizer of [MurmurHash3]. Every input bit affects every output bit, which keeps
/// the slot positions and fingerprints of nearby key hashes independent.
///
/// [MurmurHash3]: https://github.com/aappleby/smhasher/wiki/MurmurHash3
///
/// MurmurHash3 was written by Austin Appleby, who placed it in the public domain.
#[inline]
pub const fn murmur64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

/// Mixes a key hash with the filter seed.
#[inline]
pub const fn mix(key: u64, seed: u64) -> u64 {
    murmur64(key.wrapping_add(seed))
}

/// Sebastiano Vigna's [SplitMix64] generator. Advances `state` and returns the next value;
/// construction draws one seed per attempt from it.
///
/// [SplitMix64]: https://prng.di.unimi.it/splitmix64.c
///
/// Written in 2015 by Sebastiano Vigna (vigna@acm.org) and dedicated to the public domain
/// under CC0: <http://creativecommons.org/publicdomain/zero/1.0/>.
#[inline]
pub fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod test {
    use super::{mix, murmur64, splitmix64};

    #[test]
    fn test_murmur64_zero_is_fixed_point() {
        assert_eq!(murmur64(0), 0);
        assert_ne!(murmur64(1), 1);
    }

    #[test]
    fn test_mix_depends_on_seed() {
        assert_ne!(mix(42, 1), mix(42, 2));
        assert_eq!(mix(42, 7), murmur64(49));
    }

    #[test]
    fn test_splitmix64_sequence_is_distinct() {
        let mut state = 1;
        let a = splitmix64(&mut state);
        let b = splitmix64(&mut state);
        let c = splitmix64(&mut state);
        assert!(a != b && b != c && a != c);

        let mut replay = 1;
        assert_eq!(splitmix64(&mut replay), a);
    }
}
