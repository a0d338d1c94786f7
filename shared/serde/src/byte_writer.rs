/// Growable output buffer for serialized values.
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a `u32` length prefix for a payload of `length` bytes or items.
    ///
    /// # Panics
    /// Panics if `length` does not fit in a `u32`; such a payload could never
    /// fit inside a frame anyway.
    pub fn write_length(&mut self, length: usize) {
        let Ok(length) = u32::try_from(length) else {
            panic!("cannot serialize a length of {} with a u32 prefix", length);
        };
        self.write_bytes(&length.to_be_bytes());
    }

    pub fn bytes_written(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}
