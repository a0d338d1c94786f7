use thiserror::Error;

use mirror_serde::SerdeErr;

use crate::MessageKind;

/// Errors raised while framing or unframing messages.
///
/// Every variant except `Io` and `OutboundTooLarge` means the inbound stream
/// can no longer be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Declared frame length exceeds the configured maximum (SECURITY: checked before allocating)
    #[error("Malformed frame: declared length {declared} exceeds maximum frame size {max}")]
    FrameTooLarge { declared: usize, max: usize },

    /// Declared frame length of zero leaves no room for a type tag
    #[error("Malformed frame: declared length is zero")]
    EmptyFrame,

    /// Type tag does not name any known message kind
    #[error("Malformed frame: unknown message tag {tag:#04x}")]
    UnknownMessageTag { tag: u8 },

    /// Fewer bytes supplied than the frame header declares
    #[error("Malformed frame: declared length {declared} but only {available} bytes available")]
    TruncatedFrame { declared: usize, available: usize },

    /// Payload decoded cleanly but bytes were left over
    #[error("Malformed frame: {remaining} trailing bytes after {kind:?} payload")]
    TrailingBytes { kind: MessageKind, remaining: usize },

    /// Payload could not be decoded as its declared kind
    #[error("Malformed frame: invalid {kind:?} payload: {source}")]
    InvalidPayload {
        kind: MessageKind,
        #[source]
        source: SerdeErr,
    },

    /// A message to be sent does not fit in one frame
    #[error("Outbound {kind:?} message of {length} bytes exceeds maximum frame size {max}")]
    OutboundTooLarge {
        kind: MessageKind,
        length: usize,
        max: usize,
    },

    /// The underlying stream failed
    #[error("Transport I/O error: {reason}")]
    Io { reason: String },
}

impl CodecError {
    /// Whether this error reports a protocol violation by the peer
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            CodecError::Io { .. } | CodecError::OutboundTooLarge { .. }
        )
    }
}

impl From<std::io::Error> for CodecError {
    fn from(error: std::io::Error) -> Self {
        CodecError::Io {
            reason: error.to_string(),
        }
    }
}
