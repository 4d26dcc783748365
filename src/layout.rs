//! Segment geometry of binary fuse filters.
// Sizing follows https://github.com/FastFilter/xor_singleheader/blob/master/include/binaryfusefilter.h

use crate::Error;
use libm::{floor, fmax, log, round};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "bincode")]
use bincode::{de::Decoder, error::DecodeError, Decode, Encode};

/// Number of slots each key is spread over.
pub(crate) const ARITY: u32 = 3;

/// Largest segment length used, whatever the key count.
pub const MAX_SEGMENT_LENGTH: u32 = 262_144;

/// Length of the serialized header: seed, segment length, segment length mask, and segment
/// count length, each a little-endian `u64`.
pub const HEADER_LEN: usize = 32;

#[inline]
fn segment_length(size: u32) -> u32 {
    if size == 0 {
        return 4;
    }
    // Very sensitive: rounding instead of flooring noticeably slows construction.
    let exponent = floor(log(size as f64) / log(3.33_f64) + 2.25) as u32;
    1 << exponent.min(MAX_SEGMENT_LENGTH.trailing_zeros())
}

#[inline]
fn size_factor(size: u32) -> f64 {
    fmax(1.125_f64, 0.875 + 0.25 * log(1_000_000_f64) / log(size as f64))
}

/// The dimensions of a filter's fingerprint array.
///
/// The array holds `segment_count + 2` consecutive segments of `segment_length` slots. A key
/// lands in one slot of each of three consecutive segments, the first of which is picked from
/// the leading `segment_count` segments.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "LayoutFields")
)]
#[cfg_attr(feature = "bincode", derive(Encode))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    segment_length: u32,
    segment_length_mask: u32,
    segment_count_length: u32,
}

/// Layout fields as deserialized, before validation.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct LayoutFields {
    segment_length: u32,
    segment_length_mask: u32,
    segment_count_length: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<LayoutFields> for Layout {
    type Error = Error;

    fn try_from(fields: LayoutFields) -> Result<Self, Self::Error> {
        Self::from_header(
            u64::from(fields.segment_length),
            u64::from(fields.segment_length_mask),
            u64::from(fields.segment_count_length),
        )
    }
}

#[cfg(feature = "bincode")]
impl<Context> Decode<Context> for Layout {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let segment_length: u32 = Decode::decode(decoder)?;
        let segment_length_mask: u32 = Decode::decode(decoder)?;
        let segment_count_length: u32 = Decode::decode(decoder)?;
        Self::from_header(
            u64::from(segment_length),
            u64::from(segment_length_mask),
            u64::from(segment_count_length),
        )
        .map_err(|_| DecodeError::Other("inconsistent binary fuse filter layout"))
    }
}

impl Layout {
    /// Derives the layout for a filter holding `size` keys.
    ///
    /// Key counts of zero and one get the minimal layout of three 4-slot segments. Fails with
    /// [`Error::AllocationFailure`] if the array would not be addressable with 32-bit slot
    /// indices.
    pub fn for_size(size: usize) -> Result<Self, Error> {
        let too_large = Error::AllocationFailure { size };
        let size32 = u32::try_from(size).map_err(|_| too_large.clone())?;

        let segment_length = segment_length(size32);
        let capacity: u64 = if size32 > 1 {
            round(size32 as f64 * size_factor(size32)) as u64
        } else {
            0
        };

        let length = u64::from(segment_length);
        let arity = u64::from(ARITY);
        let proposed = capacity.div_ceil(length);
        let segment_count = if proposed < arity {
            1
        } else {
            proposed - (arity - 1)
        };
        let array_length = (segment_count + arity - 1) * length;
        if array_length > u64::from(u32::MAX) {
            return Err(too_large);
        }

        Ok(Self {
            segment_length,
            segment_length_mask: segment_length - 1,
            segment_count_length: (segment_count * length) as u32,
        })
    }

    /// Rebuilds a layout from serialized header fields, checking that they are consistent.
    pub(crate) fn from_header(
        segment_length: u64,
        segment_length_mask: u64,
        segment_count_length: u64,
    ) -> Result<Self, Error> {
        if segment_length == 0 || !segment_length.is_power_of_two() {
            return Err(Error::InvalidHeader("segment length is not a power of two"));
        }
        if segment_length > u64::from(MAX_SEGMENT_LENGTH) {
            return Err(Error::InvalidHeader("segment length is too large"));
        }
        if segment_length_mask != segment_length - 1 {
            return Err(Error::InvalidHeader("segment length mask does not match"));
        }
        if segment_count_length == 0 || segment_count_length % segment_length != 0 {
            return Err(Error::InvalidHeader(
                "segment count length is not a positive multiple of the segment length",
            ));
        }
        if segment_count_length + 2 * segment_length > u64::from(u32::MAX) {
            return Err(Error::InvalidHeader("array length is too large"));
        }

        Ok(Self {
            segment_length: segment_length as u32,
            segment_length_mask: segment_length_mask as u32,
            segment_count_length: segment_count_length as u32,
        })
    }

    /// Length of one segment, a power of two.
    #[inline]
    pub const fn segment_length(&self) -> u32 {
        self.segment_length
    }

    /// `segment_length - 1`.
    #[inline]
    pub const fn segment_length_mask(&self) -> u32 {
        self.segment_length_mask
    }

    /// Number of segments a key's first slot can fall in.
    #[inline]
    pub const fn segment_count(&self) -> u32 {
        self.segment_count_length / self.segment_length
    }

    /// `segment_count * segment_length`.
    #[inline]
    pub const fn segment_count_length(&self) -> u32 {
        self.segment_count_length
    }

    /// Total number of fingerprint slots.
    #[inline]
    pub const fn array_length(&self) -> usize {
        (self.segment_count_length + (ARITY - 1) * self.segment_length) as usize
    }

    /// Bytes taken by the header plus `array_length` fingerprints of `fingerprint_bytes` each.
    /// Identical on every platform.
    #[inline]
    pub const fn size_in_bytes(&self, fingerprint_bytes: usize) -> usize {
        HEADER_LEN + self.array_length() * fingerprint_bytes
    }

    /// The three slots of a mixed key hash. Always `h0 < h1 < h2 < array_length`.
    #[inline]
    pub const fn positions(&self, hash: u64) -> [usize; 3] {
        let h0 = ((hash as u128 * self.segment_count_length as u128) >> 64) as u32;
        let h1 = (h0 + self.segment_length) ^ ((hash >> 18) as u32 & self.segment_length_mask);
        let h2 = (h0 + 2 * self.segment_length) ^ (hash as u32 & self.segment_length_mask);
        [h0 as usize, h1 as usize, h2 as usize]
    }
}
