use crate::{ByteReader, ByteWriter, SerdeErr};

/// A type that can be written to and read back from the wire.
pub trait Serde: Sized + Clone + PartialEq {
    /// Append this value to the writer
    fn ser(&self, writer: &mut ByteWriter);

    /// Parse a value from the reader, advancing past it
    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr>;

    /// Number of bytes `ser` will append
    fn byte_length(&self) -> usize;
}

/// Implemented by types whose encoding always has the same size.
pub trait ConstByteLength {
    fn const_byte_length() -> usize;
}
