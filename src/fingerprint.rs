//! Fingerprint widths stored in a filter's slots.

use core::fmt::Debug;
use core::ops::BitXor;

/// An unsigned integer usable as a filter fingerprint.
///
/// A fingerprint is derived from a mixed key hash by folding its high half into its low half
/// and truncating to the fingerprint width. A folded value of zero is mapped to one, so no key
/// ever has a zero fingerprint; an all-zero slot array therefore reports every key absent.
pub trait Fingerprint:
    Copy + Default + Eq + Debug + BitXor<Output = Self> + Send + Sync + 'static
{
    /// Width of the fingerprint in bytes.
    const BYTES: usize;
    /// Width of the fingerprint in bits.
    const BITS: u32;

    /// Derives the fingerprint of a mixed key hash.
    fn from_hash(hash: u64) -> Self;

    /// Writes the fingerprint as little-endian bytes. `out` must be exactly `BYTES` long.
    fn write_le(self, out: &mut [u8]);

    /// Reads a little-endian fingerprint. `bytes` must be exactly `BYTES` long.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_fingerprint(
    ($($fpty:ty),*) => {
        $(
            impl Fingerprint for $fpty {
                const BYTES: usize = core::mem::size_of::<$fpty>();
                const BITS: u32 = <$fpty>::BITS;

                #[inline]
                fn from_hash(hash: u64) -> Self {
                    ((hash ^ (hash >> 32)) as $fpty).max(1)
                }

                #[inline]
                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; core::mem::size_of::<$fpty>()];
                    buf.copy_from_slice(bytes);
                    <$fpty>::from_le_bytes(buf)
                }
            }
        )*
    };
);

impl_fingerprint!(u8, u16, u32);

#[cfg(test)]
mod test {
    use super::Fingerprint;

    #[test]
    fn test_fingerprint_is_never_zero() {
        // Folds to exactly zero in the low 16 bits.
        let hash = 0x1234_0000_1234_0000_u64;
        assert_eq!((hash ^ (hash >> 32)) as u16, 0);
        assert_eq!(u16::from_hash(hash), 1);
        assert_eq!(u8::from_hash(0), 1);
        assert_eq!(u32::from_hash(0), 1);
    }

    #[test]
    fn test_fingerprint_folds_high_half() {
        let hash = 0x0000_00ab_0000_0001_u64;
        assert_eq!(u8::from_hash(hash), 0xaa);
        assert_eq!(u16::from_hash(hash), 0x00aa);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut out = [0u8; 2];
        0xbeef_u16.write_le(&mut out);
        assert_eq!(out, [0xef, 0xbe]);
        assert_eq!(u16::read_le(&out), 0xbeef);

        let mut out = [0u8; 4];
        0x0102_0304_u32.write_le(&mut out);
        assert_eq!(out, [4, 3, 2, 1]);
    }
}
