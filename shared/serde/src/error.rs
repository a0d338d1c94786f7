use thiserror::Error;

/// Errors produced while reading serialized bytes.
///
/// Writing never fails; every failure mode belongs to untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The reader ran out of bytes before the value was complete
    #[error("Unexpected end of input: needed {needed} more bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A string payload was not valid UTF-8
    #[error("String payload of {length} bytes is not valid UTF-8")]
    InvalidUtf8 { length: usize },

    /// A tag byte did not name any known variant
    #[error("Unknown {type_name} tag {tag:#04x}")]
    UnknownTag { type_name: &'static str, tag: u8 },

    /// A declared length or count exceeds what the remaining input could hold
    #[error("Declared length {declared} exceeds remaining input of {remaining} bytes")]
    LengthOverflow { declared: usize, remaining: usize },

    /// Nested values went deeper than the permitted bound
    #[error("Nesting depth exceeds the maximum of {max}")]
    NestingTooDeep { max: usize },

    /// A boolean byte held something other than 0 or 1
    #[error("Invalid boolean byte {byte:#04x}")]
    InvalidBool { byte: u8 },
}
