//! The composite buffer a [`crate::BufferPool`] hands out.

use bytes::BytesMut;

/// A single fixed-size slab within a [`PooledBuffer`].
const SLAB_SIZE: usize = 16 * 1024;

/// A composite byte buffer made of fixed-size slabs, so a single write can
/// gather many incoming batches without one large contiguous allocation.
///
/// `components()` exposes the filled slabs for a vectored write; the file
/// writer never needs to see the slab boundaries beyond that.
#[derive(Debug)]
pub struct PooledBuffer {
    slabs: Vec<BytesMut>,
    capacity_slabs: usize,
}

impl PooledBuffer {
    pub(crate) fn new(capacity_slabs: usize) -> Self {
        Self {
            slabs: vec![BytesMut::with_capacity(SLAB_SIZE)],
            capacity_slabs,
        }
    }

    /// Appends `bytes` to the buffer, allocating additional slabs as
    /// needed, up to this buffer's slab capacity.
    ///
    /// Returns the number of bytes actually written; a short write means
    /// the buffer is full and should be flushed.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let mut written = 0;
        while written < bytes.len() {
            let current = self.slabs.last_mut().expect("at least one slab always present");
            let space = current.capacity() - current.len();
            if space == 0 {
                if self.slabs.len() >= self.capacity_slabs {
                    break;
                }
                self.slabs.push(BytesMut::with_capacity(SLAB_SIZE));
                continue;
            }
            let take = space.min(bytes.len() - written);
            current.extend_from_slice(&bytes[written..written + take]);
            written += take;
        }
        written
    }

    /// Total bytes currently held across all slabs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slabs.iter().map(BytesMut::len).sum()
    }

    /// Returns `true` if no bytes have been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The slabs' total capacity; `len() < capacity()` means more can be
    /// written before the buffer is full.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity_slabs * SLAB_SIZE
    }

    /// The filled slabs, in write order, for a vectored write.
    pub fn components(&self) -> impl Iterator<Item = &[u8]> {
        self.slabs.iter().map(|slab| slab.as_ref())
    }

    /// Clears every slab's contents while keeping their allocations, so the
    /// buffer can be reused without reallocating.
    pub(crate) fn reset(&mut self) {
        self.slabs.truncate(1);
        for slab in &mut self.slabs {
            slab.clear();
        }
    }
}
