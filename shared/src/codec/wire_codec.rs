use bytes::{BufMut, BytesMut};
use log::trace;
use tokio_util::codec::{Decoder, Encoder};

use mirror_serde::{ByteReader, ByteWriter};

use crate::{CodecError, Message, MessageKind};

/// Default maximum accepted frame length (1 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;
/// Size of the big-endian `u32` length field that opens every frame
pub const FRAME_HEADER_SIZE: usize = 4;
/// Size of the type tag that follows the length field
pub const FRAME_TAG_SIZE: usize = 1;

/// Length-prefixed frame codec.
///
/// Layout: `[length: u32 BE][tag: u8][payload]`, where `length` counts the tag
/// and the payload. Holds no session state; clones are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireCodec {
    max_frame_size: usize,
}

impl WireCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Encodes a message into a complete frame, header included
    pub fn encode_frame(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let kind = message.kind();
        let mut body = ByteWriter::with_capacity(64);
        body.write_byte(kind.to_tag());
        message.write_body(&mut body);

        let length = body.bytes_written();
        if length > self.max_frame_size {
            return Err(CodecError::OutboundTooLarge {
                kind,
                length,
                max: self.max_frame_size,
            });
        }
        let declared = u32::try_from(length).map_err(|_| CodecError::OutboundTooLarge {
            kind,
            length,
            max: self.max_frame_size,
        })?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + length);
        frame.extend_from_slice(&declared.to_be_bytes());
        frame.extend_from_slice(body.as_slice());
        Ok(frame)
    }

    /// Decodes exactly one complete frame, header included
    pub fn decode_frame(&self, frame: &[u8]) -> Result<Message, CodecError> {
        let Some(header) = frame.get(..FRAME_HEADER_SIZE) else {
            return Err(CodecError::TruncatedFrame {
                declared: FRAME_HEADER_SIZE,
                available: frame.len(),
            });
        };
        let declared = read_declared_length(header);
        self.check_declared_length(declared)?;

        let available = frame.len() - FRAME_HEADER_SIZE;
        if available < declared {
            return Err(CodecError::TruncatedFrame {
                declared,
                available,
            });
        }
        if available > declared {
            let kind = MessageKind::from_tag(frame[FRAME_HEADER_SIZE])
                .ok_or(CodecError::UnknownMessageTag {
                    tag: frame[FRAME_HEADER_SIZE],
                })?;
            return Err(CodecError::TrailingBytes {
                kind,
                remaining: available - declared,
            });
        }

        self.decode_body(&frame[FRAME_HEADER_SIZE..])
    }

    /// Validates a declared frame length before anything is read or reserved
    pub fn check_declared_length(&self, declared: usize) -> Result<(), CodecError> {
        if declared == 0 {
            return Err(CodecError::EmptyFrame);
        }
        if declared > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                declared,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }

    // `body` is the tag followed by the payload
    fn decode_body(&self, body: &[u8]) -> Result<Message, CodecError> {
        let mut reader = ByteReader::new(body);
        let tag = reader.read_byte().map_err(|_| CodecError::EmptyFrame)?;
        let kind = MessageKind::from_tag(tag).ok_or(CodecError::UnknownMessageTag { tag })?;

        let message = Message::read_body(kind, &mut reader)
            .map_err(|source| CodecError::InvalidPayload { kind, source })?;
        if !reader.is_empty() {
            return Err(CodecError::TrailingBytes {
                kind,
                remaining: reader.remaining(),
            });
        }

        trace!("decoded {:?} frame of {} bytes", kind, body.len());
        Ok(message)
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

fn read_declared_length(header: &[u8]) -> usize {
    u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize
}

impl Decoder for WireCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }
        let declared = read_declared_length(&src[..FRAME_HEADER_SIZE]);
        self.check_declared_length(declared)?;

        let total = FRAME_HEADER_SIZE + declared;
        if src.len() < total {
            // bounded by max_frame_size, checked above
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total);
        self.decode_body(&frame[FRAME_HEADER_SIZE..]).map(Some)
    }
}

impl Encoder<Message> for WireCodec {
    type Error = CodecError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        let frame = self.encode_frame(&message)?;
        dst.reserve(frame.len());
        dst.put_slice(&frame);
        Ok(())
    }
}
