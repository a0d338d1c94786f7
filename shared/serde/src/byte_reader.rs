use crate::SerdeErr;

/// Cursor over untrusted input bytes.
///
/// Every read is bounds-checked; lengths read from the input are validated
/// against the remaining bytes before anything is allocated.
pub struct ByteReader<'b> {
    buffer: &'b [u8],
    position: usize,
}

impl<'b> ByteReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<&'b [u8], SerdeErr> {
        if length > self.remaining() {
            return Err(SerdeErr::UnexpectedEof {
                needed: length,
                remaining: self.remaining(),
            });
        }
        let start = self.position;
        self.position += length;
        Ok(&self.buffer[start..self.position])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SerdeErr> {
        let bytes = self.read_bytes(N)?;
        let mut output = [0u8; N];
        output.copy_from_slice(bytes);
        Ok(output)
    }

    /// Reads a `u32` length prefix, rejecting lengths that would need at
    /// least `min_item_size` bytes per item beyond what remains.
    pub fn read_length(&mut self, min_item_size: usize) -> Result<usize, SerdeErr> {
        let declared = u32::from_be_bytes(self.read_array::<4>()?) as usize;
        let required = declared.saturating_mul(min_item_size);
        if required > self.remaining() {
            return Err(SerdeErr::LengthOverflow {
                declared,
                remaining: self.remaining(),
            });
        }
        Ok(declared)
    }
}
