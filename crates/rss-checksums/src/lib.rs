#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rss_checksums` computes the CRC32C digest that backs
//! `CommitMetadata`, the value a file writer accumulates while appending
//! batches to a partition and that an input stream recomputes while
//! reassembling one. Matching digests at both ends is how a consumer
//! detects silent corruption introduced by a disk, a network link, or a
//! worker bug, without re-reading the whole partition from scratch.
//!
//! # Design
//!
//! [`CommitDigest`] wraps the `crc32c` crate's hardware-accelerated CRC32C
//! implementation (SSE4.2 on x86_64, available elsewhere via a software
//! fallback) behind an incremental `update` API so a file writer can feed it
//! one batch at a time as bytes arrive, rather than buffering a whole
//! partition to checksum it in one pass.
//!
//! Digests for independently-written chunks are combined with
//! [`CommitDigest::combine`], which calls `crc32c::crc32c_combine` instead of
//! re-hashing the concatenated bytes. This mirrors how a replica's digest and
//! a primary's digest for the same partition need to agree without either
//! side re-reading the other's bytes.
//!
//! # Invariants
//!
//! - [`CommitDigest::update`] never panics; arbitrary byte slices, including
//!   empty ones, are accepted.
//! - [`CommitDigest::combine`] is associative, so a byte range can be split
//!   into chunks and recombined in any bracketing order and produce the same
//!   final value as hashing the whole range directly.
//! - [`verify`] reports a [`ChecksumError::Mismatch`] rather than panicking
//!   when digests disagree, so callers can decide whether to retry a fetch,
//!   fail the stage, or fall back to a replica.
//!
//! # Errors
//!
//! [`ChecksumError`] is returned by [`verify`] when an expected and an
//! observed digest disagree, or when the expected byte count does not match
//! the number of bytes actually hashed.
//!
//! # Examples
//!
//! ```
//! use rss_checksums::CommitDigest;
//!
//! let mut digest = CommitDigest::new();
//! digest.update(b"first batch payload");
//! digest.update(b"second batch payload");
//!
//! let mut other = CommitDigest::new();
//! other.update(b"first batch payload");
//! other.update(b"second batch payload");
//!
//! assert_eq!(digest.finalize(), other.finalize());
//! assert_eq!(digest.bytes_hashed(), other.bytes_hashed());
//! ```
//!
//! # See also
//!
//! - `rss-types` for the `CommitMetadata` type that wraps a finalized digest
//!   alongside byte and record counts.
//! - `rss-client` for the input stream that calls [`verify`] once a
//!   partition has been fully reassembled.

use thiserror::Error;

/// An incremental CRC32C accumulator for a batch of payload bytes.
///
/// See the [module-level documentation](crate) for the design rationale.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitDigest {
    crc: u32,
    bytes_hashed: u64,
}

impl CommitDigest {
    /// Creates a fresh digest over zero bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            crc: 0,
            bytes_hashed: 0,
        }
    }

    /// Creates a digest that starts from a previously finalized CRC32C value.
    ///
    /// Useful when resuming a digest across a restart where only the rolled
    /// up `(crc, bytes_hashed)` pair survived.
    #[must_use]
    pub const fn resume(crc: u32, bytes_hashed: u64) -> Self {
        Self { crc, bytes_hashed }
    }

    /// Feeds another chunk of bytes into the running digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.crc = crc32c::crc32c_append(self.crc, bytes);
        self.bytes_hashed += bytes.len() as u64;
    }

    /// Combines this digest with one computed over a byte range that
    /// immediately follows this digest's range, without re-reading either
    /// range's bytes.
    #[must_use]
    pub fn combine(self, following: Self) -> Self {
        Self {
            crc: crc32c::crc32c_combine(self.crc, following.crc, following.bytes_hashed as usize),
            bytes_hashed: self.bytes_hashed + following.bytes_hashed,
        }
    }

    /// Returns the CRC32C value accumulated so far.
    #[must_use]
    pub const fn finalize(&self) -> u32 {
        self.crc
    }

    /// Returns the number of bytes hashed so far.
    #[must_use]
    pub const fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }
}

/// Errors produced while verifying a digest against an expected value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChecksumError {
    /// The observed CRC32C did not match the expected one.
    #[error("checksum mismatch: expected crc32c {expected:#010x}, got {actual:#010x}")]
    Mismatch {
        /// The digest recorded when the partition was written.
        expected: u32,
        /// The digest recomputed while reading the partition back.
        actual: u32,
    },
    /// The number of bytes hashed did not match the expected byte count.
    #[error("byte count mismatch: expected {expected} bytes, hashed {actual} bytes")]
    ByteCountMismatch {
        /// The byte count recorded when the partition was written.
        expected: u64,
        /// The byte count actually observed while hashing.
        actual: u64,
    },
}

/// Verifies that an observed digest matches the digest recorded at write
/// time, checking both the CRC32C value and the byte count.
///
/// # Errors
///
/// Returns [`ChecksumError::ByteCountMismatch`] if the byte counts disagree,
/// or [`ChecksumError::Mismatch`] if the byte counts agree but the CRC32C
/// values do not.
pub fn verify(expected: CommitDigest, actual: CommitDigest) -> Result<(), ChecksumError> {
    if expected.bytes_hashed != actual.bytes_hashed {
        return Err(ChecksumError::ByteCountMismatch {
            expected: expected.bytes_hashed,
            actual: actual.bytes_hashed,
        });
    }
    if expected.crc != actual.crc {
        return Err(ChecksumError::Mismatch {
            expected: expected.crc,
            actual: actual.crc,
        });
    }
    Ok(())
}
