//! Credit-based chunk streaming for a partition file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use rss_protocol::{ChunkData, OpenStream, ReadAddCredit, StreamHandle};
use rss_storage::ChunkOffsetIndex;
use rss_types::MapIdBitmap;

use crate::error::FetchError;

struct StreamState {
    file: PathBuf,
    offsets: Vec<u64>,
    next_chunk: u32,
    credit: u32,
}

/// Serves chunks of already-flushed partition files to clients that have
/// opened a stream and hold credit for it.
///
/// Chunk boundaries come from the [`ChunkOffsetIndex`] a [`crate::PushHandler`]
/// recorded when it closed the corresponding writer. `start_map`/`end_map`
/// in [`OpenStream`] are checked against that writer's recorded
/// [`MapIdBitmap`]: a file whose bitmap has no map id in `[start_map,
/// end_map)` is skipped entirely (an empty stream is opened rather than its
/// chunks served), since nothing a reader wants can be in it.
pub struct FetchServer {
    base_dir: PathBuf,
    indices: Arc<DashMap<String, ChunkOffsetIndex>>,
    map_bitmaps: Arc<DashMap<String, MapIdBitmap>>,
    streams: Mutex<HashMap<u64, StreamState>>,
    next_stream_id: AtomicU64,
}

impl FetchServer {
    /// Creates a server rooted at `base_dir`, resolving `file_name`s through
    /// `indices` and `map_bitmaps` (both shared with the
    /// [`crate::PushHandler`] that populates them).
    #[must_use]
    pub fn new(
        base_dir: PathBuf,
        indices: Arc<DashMap<String, ChunkOffsetIndex>>,
        map_bitmaps: Arc<DashMap<String, MapIdBitmap>>,
    ) -> Self {
        Self {
            base_dir,
            indices,
            map_bitmaps,
            streams: Mutex::new(HashMap::new()),
            next_stream_id: AtomicU64::new(1),
        }
    }

    /// Opens a stream over `request.file_name`'s full chunk range, starting
    /// with `request.initial_credit` chunks available to send.
    ///
    /// If this file's recorded map-id bitmap does not intersect
    /// `[request.start_map, request.end_map)`, an empty stream (zero
    /// chunks) is opened instead of serving any of its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnknownFile`] if no writer has recorded a
    /// chunk index for that file name.
    pub fn open_stream(&self, request: &OpenStream) -> Result<StreamHandle, FetchError> {
        let index = self
            .indices
            .get(&request.file_name)
            .ok_or_else(|| FetchError::UnknownFile {
                file_name: request.file_name.clone(),
            })?;

        let skip = self
            .map_bitmaps
            .get(&request.file_name)
            .is_some_and(|bitmap| !bitmap_intersects_range(&bitmap, request.start_map, request.end_map));

        let (offsets, num_chunks) = if skip {
            (vec![0], 0)
        } else {
            (index.offsets().to_vec(), index.chunk_count() as u32)
        };
        let stream_id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);

        self.streams.lock().expect("streams lock poisoned").insert(
            stream_id,
            StreamState {
                file: self.base_dir.join(&request.file_name),
                offsets: offsets.clone(),
                next_chunk: 0,
                credit: request.initial_credit,
            },
        );

        Ok(StreamHandle {
            stream_id,
            num_chunks,
            chunk_offsets: offsets,
        })
    }

    /// Adds `request.credit` additional chunks of sending allowance to an
    /// open stream.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnknownStream`] if the stream id is not open.
    pub fn add_credit(&self, request: ReadAddCredit) -> Result<(), FetchError> {
        let mut streams = self.streams.lock().expect("streams lock poisoned");
        let state = streams.get_mut(&request.stream_id).ok_or(FetchError::UnknownStream {
            stream_id: request.stream_id,
        })?;
        state.credit = state.credit.saturating_add(request.credit);
        Ok(())
    }

    /// Returns the next chunk for `stream_id`, or `Ok(None)` if the stream
    /// has no credit left or has already sent its final chunk.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnknownStream`] if the stream id is not open,
    /// or [`FetchError::Io`] if reading the chunk's bytes off disk fails.
    pub fn next_chunk(&self, stream_id: u64) -> Result<Option<ChunkData>, FetchError> {
        let (file, start, end, chunk_index, backlog) = {
            let mut streams = self.streams.lock().expect("streams lock poisoned");
            let state = streams.get_mut(&stream_id).ok_or(FetchError::UnknownStream { stream_id })?;

            if state.credit == 0 {
                return Ok(None);
            }
            let num_chunks = state.offsets.len().saturating_sub(1) as u32;
            if state.next_chunk >= num_chunks {
                return Ok(None);
            }

            let chunk_index = state.next_chunk;
            let start = state.offsets[chunk_index as usize];
            let end = state.offsets[chunk_index as usize + 1];
            state.next_chunk += 1;
            state.credit -= 1;
            let backlog = num_chunks - state.next_chunk;
            (state.file.clone(), start, end, chunk_index, backlog)
        };

        let mut payload = vec![0u8; (end - start) as usize];
        let mut handle = File::open(&file).map_err(|source| FetchError::Io {
            file: file.display().to_string(),
            source,
        })?;
        handle.seek(SeekFrom::Start(start)).map_err(|source| FetchError::Io {
            file: file.display().to_string(),
            source,
        })?;
        handle.read_exact(&mut payload).map_err(|source| FetchError::Io {
            file: file.display().to_string(),
            source,
        })?;

        Ok(Some(ChunkData {
            stream_id,
            chunk_index,
            backlog,
            offset: start,
            payload,
        }))
    }

    /// Drops a stream's bookkeeping once a client is done with it.
    pub fn close_stream(&self, stream_id: u64) {
        self.streams.lock().expect("streams lock poisoned").remove(&stream_id);
    }
}

/// Returns `true` if `bitmap` contains any map id in `[start, end)`.
fn bitmap_intersects_range(bitmap: &MapIdBitmap, start: u32, end: u32) -> bool {
    bitmap.iter().any(|map_id| map_id >= start && map_id < end)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Indices = Arc<DashMap<String, ChunkOffsetIndex>>;
    type Bitmaps = Arc<DashMap<String, MapIdBitmap>>;

    fn setup() -> (tempfile::TempDir, Indices, Bitmaps) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("partition-0"), b"hello world!").unwrap();
        let mut index = ChunkOffsetIndex::new();
        index.register_chunk(5);
        index.register_chunk(7);
        let indices = Arc::new(DashMap::new());
        indices.insert("partition-0".to_string(), index);

        let mut bitmap = MapIdBitmap::new();
        bitmap.insert(0);
        let bitmaps = Arc::new(DashMap::new());
        bitmaps.insert("partition-0".to_string(), bitmap);

        (dir, indices, bitmaps)
    }

    #[test]
    fn open_stream_returns_chunk_offsets() {
        let (dir, indices, bitmaps) = setup();
        let server = FetchServer::new(dir.path().to_path_buf(), indices, bitmaps);
        let handle = server
            .open_stream(&OpenStream {
                shuffle_key: "app/0/0".to_string(),
                file_name: "partition-0".to_string(),
                start_map: 0,
                end_map: 1,
                initial_credit: 1,
            })
            .unwrap();
        assert_eq!(handle.num_chunks, 2);
        assert_eq!(handle.chunk_offsets, vec![0, 5, 12]);
    }

    #[test]
    fn open_stream_for_unknown_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let indices = Arc::new(DashMap::new());
        let bitmaps = Arc::new(DashMap::new());
        let server = FetchServer::new(dir.path().to_path_buf(), indices, bitmaps);
        let err = server
            .open_stream(&OpenStream {
                shuffle_key: "app/0/0".to_string(),
                file_name: "missing".to_string(),
                start_map: 0,
                end_map: 1,
                initial_credit: 1,
            })
            .unwrap_err();
        assert!(matches!(err, FetchError::UnknownFile { .. }));
    }

    #[test]
    fn open_stream_skips_files_whose_bitmap_misses_the_requested_range() {
        let (dir, indices, bitmaps) = setup();
        let server = FetchServer::new(dir.path().to_path_buf(), indices, bitmaps);
        let handle = server
            .open_stream(&OpenStream {
                shuffle_key: "app/0/0".to_string(),
                file_name: "partition-0".to_string(),
                start_map: 5,
                end_map: 10,
                initial_credit: 1,
            })
            .unwrap();
        assert_eq!(handle.num_chunks, 0);
        assert!(server.next_chunk(handle.stream_id).unwrap().is_none());
    }

    #[test]
    fn open_stream_serves_files_with_no_recorded_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("partition-0"), b"hello world!").unwrap();
        let mut index = ChunkOffsetIndex::new();
        index.register_chunk(5);
        index.register_chunk(7);
        let indices = Arc::new(DashMap::new());
        indices.insert("partition-0".to_string(), index);
        let bitmaps = Arc::new(DashMap::new());

        let server = FetchServer::new(dir.path().to_path_buf(), indices, bitmaps);
        let handle = server
            .open_stream(&OpenStream {
                shuffle_key: "app/0/0".to_string(),
                file_name: "partition-0".to_string(),
                start_map: 5,
                end_map: 10,
                initial_credit: 1,
            })
            .unwrap();
        assert_eq!(handle.num_chunks, 2);
    }

    #[test]
    fn next_chunk_respects_credit_and_reads_correct_bytes() {
        let (dir, indices, bitmaps) = setup();
        let server = FetchServer::new(dir.path().to_path_buf(), indices, bitmaps);
        let handle = server
            .open_stream(&OpenStream {
                shuffle_key: "app/0/0".to_string(),
                file_name: "partition-0".to_string(),
                start_map: 0,
                end_map: 1,
                initial_credit: 1,
            })
            .unwrap();

        let chunk = server.next_chunk(handle.stream_id).unwrap().unwrap();
        assert_eq!(chunk.payload, b"hello");
        assert_eq!(chunk.backlog, 1);

        assert!(server.next_chunk(handle.stream_id).unwrap().is_none());

        server
            .add_credit(ReadAddCredit {
                stream_id: handle.stream_id,
                credit: 1,
            })
            .unwrap();
        let chunk = server.next_chunk(handle.stream_id).unwrap().unwrap();
        assert_eq!(chunk.payload, b" world!");
        assert_eq!(chunk.backlog, 0);

        assert!(server.next_chunk(handle.stream_id).unwrap().is_none());
    }

    #[test]
    fn close_stream_makes_subsequent_calls_fail() {
        let (dir, indices, bitmaps) = setup();
        let server = FetchServer::new(dir.path().to_path_buf(), indices, bitmaps);
        let handle = server
            .open_stream(&OpenStream {
                shuffle_key: "app/0/0".to_string(),
                file_name: "partition-0".to_string(),
                start_map: 0,
                end_map: 1,
                initial_credit: 1,
            })
            .unwrap();
        server.close_stream(handle.stream_id);
        assert!(matches!(server.next_chunk(handle.stream_id), Err(FetchError::UnknownStream { .. })));
    }
}
