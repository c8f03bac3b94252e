//! Length-prefixed framing for [`Message`]s.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use rss_types::BatchHeader;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::message::{Ack, ChunkData, Message, OpenStream, PushData, PushMergedData, PushMode, ReadAddCredit, StreamHandle};

/// A framed [`Message`]. The frame header carries only a length and a tag;
/// the message itself self-describes every variable-length field it
/// contains.
pub type Frame = Message;

/// Upper bound on a single frame's declared length, guarding against a
/// corrupt or malicious length prefix causing an unbounded allocation.
///
/// Chosen to comfortably exceed the largest merged push request or chunk a
/// worker is configured to emit; see the storage layer's chunk size
/// default.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

const LEN_PREFIX_BYTES: usize = 4;

const TAG_PUSH_DATA: u8 = 1;
const TAG_PUSH_MERGED_DATA: u8 = 2;
const TAG_ACK: u8 = 3;
const TAG_OPEN_STREAM: u8 = 4;
const TAG_STREAM_HANDLE: u8 = 5;
const TAG_READ_ADD_CREDIT: u8 = 6;
const TAG_CHUNK_DATA: u8 = 7;

fn put_string(dst: &mut BytesMut, s: &str) {
    dst.put_u32_le(s.len() as u32);
    dst.put_slice(s.as_bytes());
}

fn get_string(src: &mut Bytes, field: &'static str) -> Result<String, ProtocolError> {
    let len = get_u32(src, field)? as usize;
    if src.remaining() < len {
        return Err(ProtocolError::Truncated {
            expected: len,
            actual: src.remaining(),
        });
    }
    let bytes = src.split_to(len);
    String::from_utf8(bytes.to_vec()).map_err(|e| ProtocolError::MalformedBody {
        message: field,
        reason: e.to_string(),
    })
}

fn put_bytes(dst: &mut BytesMut, bytes: &[u8]) {
    dst.put_u32_le(bytes.len() as u32);
    dst.put_slice(bytes);
}

fn get_bytes(src: &mut Bytes, field: &'static str) -> Result<Vec<u8>, ProtocolError> {
    let len = get_u32(src, field)? as usize;
    if src.remaining() < len {
        return Err(ProtocolError::Truncated {
            expected: len,
            actual: src.remaining(),
        });
    }
    Ok(src.split_to(len).to_vec())
}

fn get_u32(src: &mut Bytes, field: &'static str) -> Result<u32, ProtocolError> {
    if src.remaining() < 4 {
        return Err(ProtocolError::MalformedBody {
            message: field,
            reason: "expected a 4-byte integer".to_string(),
        });
    }
    Ok(src.get_u32_le())
}

fn get_u64(src: &mut Bytes, field: &'static str) -> Result<u64, ProtocolError> {
    if src.remaining() < 8 {
        return Err(ProtocolError::MalformedBody {
            message: field,
            reason: "expected an 8-byte integer".to_string(),
        });
    }
    Ok(src.get_u64_le())
}

fn put_headers(dst: &mut BytesMut, headers: &[BatchHeader]) {
    dst.put_u32_le(headers.len() as u32);
    for header in headers {
        dst.put_slice(&header.to_bytes());
    }
}

fn get_headers(src: &mut Bytes, field: &'static str) -> Result<Vec<BatchHeader>, ProtocolError> {
    let count = get_u32(src, field)? as usize;
    let mut headers = Vec::with_capacity(count);
    for _ in 0..count {
        if src.remaining() < 16 {
            return Err(ProtocolError::Truncated {
                expected: 16,
                actual: src.remaining(),
            });
        }
        let mut raw = [0u8; 16];
        src.copy_to_slice(&mut raw);
        headers.push(BatchHeader::from_bytes(raw));
    }
    Ok(headers)
}

fn put_u32_vec(dst: &mut BytesMut, values: &[u32]) {
    dst.put_u32_le(values.len() as u32);
    for value in values {
        dst.put_u32_le(*value);
    }
}

fn get_u32_vec(src: &mut Bytes, field: &'static str) -> Result<Vec<u32>, ProtocolError> {
    let count = get_u32(src, field)? as usize;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(get_u32(src, field)?);
    }
    Ok(values)
}

fn put_u64_vec(dst: &mut BytesMut, values: &[u64]) {
    dst.put_u32_le(values.len() as u32);
    for value in values {
        dst.put_u64_le(*value);
    }
}

fn get_u64_vec(src: &mut Bytes, field: &'static str) -> Result<Vec<u64>, ProtocolError> {
    let count = get_u32(src, field)? as usize;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(get_u64(src, field)?);
    }
    Ok(values)
}

fn put_mode(dst: &mut BytesMut, mode: PushMode) {
    dst.put_u8(match mode {
        PushMode::Primary => 0,
        PushMode::Replica => 1,
    });
}

fn get_mode(src: &mut Bytes, field: &'static str) -> Result<PushMode, ProtocolError> {
    if src.remaining() < 1 {
        return Err(ProtocolError::MalformedBody {
            message: field,
            reason: "expected a mode byte".to_string(),
        });
    }
    match src.get_u8() {
        0 => Ok(PushMode::Primary),
        1 => Ok(PushMode::Replica),
        other => Err(ProtocolError::MalformedBody {
            message: field,
            reason: format!("unknown push mode byte {other}"),
        }),
    }
}

fn put_ack(dst: &mut BytesMut, ack: Ack) {
    dst.put_u8(match ack {
        Ack::Success => 0,
        Ack::SoftSplit => 1,
        Ack::HardSplit => 2,
        Ack::StageEnd => 3,
        Ack::PushDataFailPrimary => 4,
        Ack::PushDataFailReplica => 5,
        Ack::CongestControl => 6,
        Ack::PausePush => 7,
    });
}

fn get_ack(src: &mut Bytes) -> Result<Ack, ProtocolError> {
    if src.remaining() < 1 {
        return Err(ProtocolError::MalformedBody {
            message: "Ack",
            reason: "expected a status byte".to_string(),
        });
    }
    match src.get_u8() {
        0 => Ok(Ack::Success),
        1 => Ok(Ack::SoftSplit),
        2 => Ok(Ack::HardSplit),
        3 => Ok(Ack::StageEnd),
        4 => Ok(Ack::PushDataFailPrimary),
        5 => Ok(Ack::PushDataFailReplica),
        6 => Ok(Ack::CongestControl),
        7 => Ok(Ack::PausePush),
        other => Err(ProtocolError::MalformedBody {
            message: "Ack",
            reason: format!("unknown status byte {other}"),
        }),
    }
}

fn encode_body(msg: &Message, dst: &mut BytesMut) -> u8 {
    match msg {
        Message::PushData(push) => {
            put_string(dst, &push.shuffle_key);
            dst.put_u32_le(push.partition_location_id);
            dst.put_u32_le(push.epoch);
            put_mode(dst, push.mode);
            dst.put_slice(&push.header.to_bytes());
            put_bytes(dst, &push.body);
            TAG_PUSH_DATA
        }
        Message::PushMergedData(push) => {
            put_string(dst, &push.shuffle_key);
            dst.put_u32_le(push.partition_location_id);
            dst.put_u32_le(push.epoch);
            put_mode(dst, push.mode);
            put_headers(dst, &push.headers);
            put_u32_vec(dst, &push.offsets);
            put_bytes(dst, &push.body);
            TAG_PUSH_MERGED_DATA
        }
        Message::Ack(ack) => {
            put_ack(dst, *ack);
            TAG_ACK
        }
        Message::OpenStream(open) => {
            put_string(dst, &open.shuffle_key);
            put_string(dst, &open.file_name);
            dst.put_u32_le(open.start_map);
            dst.put_u32_le(open.end_map);
            dst.put_u32_le(open.initial_credit);
            TAG_OPEN_STREAM
        }
        Message::StreamHandle(handle) => {
            dst.put_u64_le(handle.stream_id);
            dst.put_u32_le(handle.num_chunks);
            put_u64_vec(dst, &handle.chunk_offsets);
            TAG_STREAM_HANDLE
        }
        Message::ReadAddCredit(credit) => {
            dst.put_u64_le(credit.stream_id);
            dst.put_u32_le(credit.credit);
            TAG_READ_ADD_CREDIT
        }
        Message::ChunkData(chunk) => {
            dst.put_u64_le(chunk.stream_id);
            dst.put_u32_le(chunk.chunk_index);
            dst.put_u32_le(chunk.backlog);
            dst.put_u64_le(chunk.offset);
            put_bytes(dst, &chunk.payload);
            TAG_CHUNK_DATA
        }
    }
}

fn decode_body(tag: u8, mut body: Bytes) -> Result<Message, ProtocolError> {
    match tag {
        TAG_PUSH_DATA => {
            let shuffle_key = get_string(&mut body, "PushData.shuffle_key")?;
            let partition_location_id = get_u32(&mut body, "PushData.partition_location_id")?;
            let epoch = get_u32(&mut body, "PushData.epoch")?;
            let mode = get_mode(&mut body, "PushData.mode")?;
            if body.remaining() < 16 {
                return Err(ProtocolError::Truncated {
                    expected: 16,
                    actual: body.remaining(),
                });
            }
            let mut raw = [0u8; 16];
            body.copy_to_slice(&mut raw);
            let header = BatchHeader::from_bytes(raw);
            let payload = get_bytes(&mut body, "PushData.body")?;
            Ok(Message::PushData(PushData {
                shuffle_key,
                partition_location_id,
                epoch,
                mode,
                header,
                body: payload,
            }))
        }
        TAG_PUSH_MERGED_DATA => {
            let shuffle_key = get_string(&mut body, "PushMergedData.shuffle_key")?;
            let partition_location_id = get_u32(&mut body, "PushMergedData.partition_location_id")?;
            let epoch = get_u32(&mut body, "PushMergedData.epoch")?;
            let mode = get_mode(&mut body, "PushMergedData.mode")?;
            let headers = get_headers(&mut body, "PushMergedData.headers")?;
            let offsets = get_u32_vec(&mut body, "PushMergedData.offsets")?;
            let payload = get_bytes(&mut body, "PushMergedData.body")?;
            Ok(Message::PushMergedData(PushMergedData {
                shuffle_key,
                partition_location_id,
                epoch,
                mode,
                headers,
                offsets,
                body: payload,
            }))
        }
        TAG_ACK => Ok(Message::Ack(get_ack(&mut body)?)),
        TAG_OPEN_STREAM => {
            let shuffle_key = get_string(&mut body, "OpenStream.shuffle_key")?;
            let file_name = get_string(&mut body, "OpenStream.file_name")?;
            let start_map = get_u32(&mut body, "OpenStream.start_map")?;
            let end_map = get_u32(&mut body, "OpenStream.end_map")?;
            let initial_credit = get_u32(&mut body, "OpenStream.initial_credit")?;
            Ok(Message::OpenStream(OpenStream {
                shuffle_key,
                file_name,
                start_map,
                end_map,
                initial_credit,
            }))
        }
        TAG_STREAM_HANDLE => {
            let stream_id = get_u64(&mut body, "StreamHandle.stream_id")?;
            let num_chunks = get_u32(&mut body, "StreamHandle.num_chunks")?;
            let chunk_offsets = get_u64_vec(&mut body, "StreamHandle.chunk_offsets")?;
            Ok(Message::StreamHandle(StreamHandle {
                stream_id,
                num_chunks,
                chunk_offsets,
            }))
        }
        TAG_READ_ADD_CREDIT => {
            let stream_id = get_u64(&mut body, "ReadAddCredit.stream_id")?;
            let credit = get_u32(&mut body, "ReadAddCredit.credit")?;
            Ok(Message::ReadAddCredit(ReadAddCredit { stream_id, credit }))
        }
        TAG_CHUNK_DATA => {
            let stream_id = get_u64(&mut body, "ChunkData.stream_id")?;
            let chunk_index = get_u32(&mut body, "ChunkData.chunk_index")?;
            let backlog = get_u32(&mut body, "ChunkData.backlog")?;
            let offset = get_u64(&mut body, "ChunkData.offset")?;
            let payload = get_bytes(&mut body, "ChunkData.payload")?;
            Ok(Message::ChunkData(ChunkData {
                stream_id,
                chunk_index,
                backlog,
                offset,
                payload,
            }))
        }
        other => Err(ProtocolError::UnknownTag { tag: other }),
    }
}

/// A [`tokio_util::codec::Decoder`] and [`tokio_util::codec::Encoder`] pair
/// that frames a byte stream into [`Frame`]s.
///
/// Each frame is `length: u32 le | tag: u8 | body`, where `length` counts
/// the tag byte and the body but not itself. `decode` returns `Ok(None)`
/// until a full frame has arrived, matching the contract every
/// `tokio_util` codec follows.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    /// Creates a new codec instance. Codecs are stateless between frames,
    /// so this is equivalent to [`FrameCodec::default`].
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LEN_PREFIX_BYTES {
            return Ok(None);
        }
        let len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        if len > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: MAX_FRAME_LEN,
            });
        }
        let total = LEN_PREFIX_BYTES + len as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total).freeze();
        frame.advance(LEN_PREFIX_BYTES);
        if frame.remaining() < 1 {
            return Err(ProtocolError::Truncated {
                expected: 1,
                actual: 0,
            });
        }
        let tag = frame.get_u8();
        decode_body(tag, frame).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut body = BytesMut::new();
        let tag = encode_body(&item, &mut body);
        let len = 1 + body.len();
        if len as u64 > u64::from(MAX_FRAME_LEN) {
            return Err(ProtocolError::FrameTooLarge {
                len: len as u32,
                max: MAX_FRAME_LEN,
            });
        }
        dst.reserve(LEN_PREFIX_BYTES + len);
        dst.put_u32_le(len as u32);
        dst.put_u8(tag);
        dst.put_slice(&body);
        Ok(())
    }
}
