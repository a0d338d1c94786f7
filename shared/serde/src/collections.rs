use std::collections::BTreeMap;

use crate::{ByteReader, ByteWriter, Serde, SerdeErr};

// Strings

impl Serde for String {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_length(self.len());
        writer.write_bytes(self.as_bytes());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let length = reader.read_length(1)?;
        let bytes = reader.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr::InvalidUtf8 { length })
    }

    fn byte_length(&self) -> usize {
        4 + self.len()
    }
}

// Options

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            Some(value) => {
                true.ser(writer);
                value.ser(writer);
            }
            None => false.ser(writer),
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        if bool::de(reader)? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }

    fn byte_length(&self) -> usize {
        1 + self.as_ref().map(Serde::byte_length).unwrap_or(0)
    }
}

// Sequences

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_length(self.len());
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        // every item occupies at least one byte, except zero-sized ones which
        // are never sent in sequences
        let count = reader.read_length(1)?;
        let mut output = Vec::with_capacity(count);
        for _ in 0..count {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }

    fn byte_length(&self) -> usize {
        4 + self.iter().map(Serde::byte_length).sum::<usize>()
    }
}

// Maps

impl<K: Serde + Ord, V: Serde> Serde for BTreeMap<K, V> {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_length(self.len());
        for (key, value) in self {
            key.ser(writer);
            value.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let count = reader.read_length(2)?;
        let mut output = BTreeMap::new();
        for _ in 0..count {
            let key = K::de(reader)?;
            let value = V::de(reader)?;
            output.insert(key, value);
        }
        Ok(output)
    }

    fn byte_length(&self) -> usize {
        4 + self
            .iter()
            .map(|(key, value)| key.byte_length() + value.byte_length())
            .sum::<usize>()
    }
}

// Pairs

impl<A: Serde, B: Serde> Serde for (A, B) {
    fn ser(&self, writer: &mut ByteWriter) {
        self.0.ser(writer);
        self.1.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok((A::de(reader)?, B::de(reader)?))
    }

    fn byte_length(&self) -> usize {
        self.0.byte_length() + self.1.byte_length()
    }
}
