//! The batch header every batch payload is prefixed with, on the wire and
//! on disk.

/// Reserved `batch_id` carrying a per-map [`crate::CommitMetadata`] digest
/// instead of user bytes.
///
/// Batch ids belonging to the same `(map_id, attempt_id)` are numbered
/// monotonically from 0, so this value is chosen close to `u32::MAX` to
/// stay out of that range for any realistic batch count.
pub const METADATA_BATCH_ID: u32 = 0xFFFF_FFFE;

/// The fixed sixteen-byte little-endian header preceding every batch
/// payload.
///
/// See spec.md's wire-format section for the exact byte layout; this type
/// is the in-memory mirror that `rss-protocol`'s codec encodes and decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchHeader {
    /// The map task that produced this batch.
    pub map_id: u32,
    /// The map task's attempt number; a map task may be retried and produce
    /// multiple attempts, of which only one is ultimately valid.
    pub attempt_id: u32,
    /// Monotonically increasing index within `(map_id, attempt_id)`.
    pub batch_id: u32,
    /// Length in bytes of the payload following this header.
    pub payload_size: u32,
}

/// Byte length of the encoded [`BatchHeader`].
pub const HEADER_LEN: usize = 16;

impl BatchHeader {
    /// Creates a header for a regular data batch.
    #[must_use]
    pub const fn new(map_id: u32, attempt_id: u32, batch_id: u32, payload_size: u32) -> Self {
        Self {
            map_id,
            attempt_id,
            batch_id,
            payload_size,
        }
    }

    /// Creates the header for the metadata batch that terminates a map
    /// task's batch stream.
    #[must_use]
    pub const fn metadata(map_id: u32, attempt_id: u32, payload_size: u32) -> Self {
        Self {
            map_id,
            attempt_id,
            batch_id: METADATA_BATCH_ID,
            payload_size,
        }
    }

    /// Returns `true` if this header describes a [`CommitMetadata`]
    /// payload rather than user batch bytes.
    ///
    /// [`CommitMetadata`]: crate::CommitMetadata
    #[must_use]
    pub const fn is_metadata(&self) -> bool {
        self.batch_id == METADATA_BATCH_ID
    }

    /// Encodes this header as sixteen little-endian bytes.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let map_id = self.map_id.to_le_bytes();
        let attempt_id = self.attempt_id.to_le_bytes();
        let batch_id = self.batch_id.to_le_bytes();
        let payload_size = self.payload_size.to_le_bytes();

        let mut i = 0;
        while i < 4 {
            out[i] = map_id[i];
            out[4 + i] = attempt_id[i];
            out[8 + i] = batch_id[i];
            out[12 + i] = payload_size[i];
            i += 1;
        }
        out
    }

    /// Decodes a header from exactly sixteen little-endian bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; HEADER_LEN]) -> Self {
        Self {
            map_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            attempt_id: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            batch_id: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            payload_size: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }
    }
}
