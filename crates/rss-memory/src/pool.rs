//! A bounded, reusable pool of [`PooledBuffer`]s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::buffer::PooledBuffer;
use crate::error::MemoryError;
use crate::tracker::{MemoryKind, MemoryTracker};

struct Inner {
    free_tx: Sender<PooledBuffer>,
    free_rx: Receiver<PooledBuffer>,
    tracker: Option<Arc<MemoryTracker>>,
}

/// A fixed set of reusable [`PooledBuffer`]s, each made of `slabs_per_buffer`
/// fixed-size slabs.
///
/// The pool enforces its memory budget simply by its bounded size: once
/// every buffer is checked out, [`BufferPool::acquire`] blocks (up to a
/// timeout) rather than allocating beyond the configured count. When a
/// [`MemoryTracker`] is attached, acquiring and releasing a buffer also
/// debits and credits its `NettyDirect` counter.
///
/// Cloning a `BufferPool` is cheap and shares the same underlying slots,
/// so a pool can be handed to a disk flusher's worker threads directly.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

impl BufferPool {
    /// Creates a pool of `count` buffers, each `slabs_per_buffer` slabs.
    #[must_use]
    pub fn new(count: usize, slabs_per_buffer: usize) -> Self {
        Self::with_tracker(count, slabs_per_buffer, None)
    }

    /// Creates a pool that debits and credits `tracker`'s `NettyDirect`
    /// counter as buffers are acquired and released.
    #[must_use]
    pub fn with_tracker(count: usize, slabs_per_buffer: usize, tracker: Option<Arc<MemoryTracker>>) -> Self {
        let (free_tx, free_rx) = crossbeam_channel::bounded(count.max(1));
        for _ in 0..count {
            let _ = free_tx.send(PooledBuffer::new(slabs_per_buffer));
        }
        Self {
            inner: Arc::new(Inner {
                free_tx,
                free_rx,
                tracker,
            }),
        }
    }

    /// Checks out a buffer, waiting up to `timeout` for one to free up.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::BufferExhausted`] if no buffer becomes
    /// available within `timeout`.
    pub fn acquire(&self, timeout: Duration) -> Result<Acquired, MemoryError> {
        let started = Instant::now();
        let buffer = self
            .inner
            .free_rx
            .recv_timeout(timeout)
            .map_err(|_| MemoryError::BufferExhausted {
                waited_ms: started.elapsed().as_millis() as u64,
            })?;
        if let Some(tracker) = &self.inner.tracker {
            tracker.add(MemoryKind::NettyDirect, buffer.capacity() as u64);
        }
        Ok(Acquired {
            buffer: Some(buffer),
            pool: self.inner.clone(),
        })
    }

    /// The total number of buffers this pool manages, checked out or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.free_tx.capacity().unwrap_or(0)
    }

    /// The number of buffers currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.free_rx.len()
    }
}

/// A checked-out [`PooledBuffer`], returned to its pool when dropped.
pub struct Acquired {
    buffer: Option<PooledBuffer>,
    pool: Arc<Inner>,
}

impl std::ops::Deref for Acquired {
    type Target = PooledBuffer;

    fn deref(&self) -> &Self::Target {
        self.buffer.as_ref().expect("buffer present until drop")
    }
}

impl std::ops::DerefMut for Acquired {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buffer.as_mut().expect("buffer present until drop")
    }
}

impl Drop for Acquired {
    fn drop(&mut self) {
        if let Some(mut buffer) = self.buffer.take() {
            if let Some(tracker) = &self.pool.tracker {
                tracker.release(MemoryKind::NettyDirect, buffer.capacity() as u64);
            }
            buffer.reset();
            let _ = self.pool.free_tx.send(buffer);
        }
    }
}
