//! Errors returned by filter allocation, construction, and deserialization.

use thiserror::Error;

/// Failure modes of fallible filter operations. Queries never fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The fingerprint array for `size` keys could not be sized or allocated.
    #[error("cannot allocate a filter for {size} keys")]
    AllocationFailure {
        /// Requested key count.
        size: usize,
    },

    /// More keys were supplied than the filter has slots.
    #[error("{keys} keys do not fit in a filter with {slots} slots")]
    CapacityExceeded {
        /// Keys supplied.
        keys: usize,
        /// Slots available.
        slots: usize,
    },

    /// Peeling left a non-empty 2-core for every seed tried.
    #[error("failed to construct binary fuse filter after {attempts} attempts")]
    ConstructionFailure {
        /// Seeds tried.
        attempts: usize,
    },

    /// A buffer is shorter than the serialized filter requires.
    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        actual: usize,
    },

    /// The fingerprint body does not match the length implied by the header.
    #[error("fingerprint body is {actual} bytes, header implies {expected}")]
    InvalidLength {
        /// Body length implied by the header.
        expected: usize,
        /// Body length found.
        actual: usize,
    },

    /// A header field is inconsistent.
    #[error("invalid filter header: {0}")]
    InvalidHeader(&'static str),
}
