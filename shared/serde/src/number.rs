use crate::{ByteReader, ByteWriter, ConstByteLength, Serde, SerdeErr};

// Fixed-width numbers, all big-endian

macro_rules! impl_serde_for_number {
    ($($impl_type:ty),*) => {
        $(
            impl Serde for $impl_type {
                fn ser(&self, writer: &mut ByteWriter) {
                    writer.write_bytes(&self.to_be_bytes());
                }

                fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
                    let bytes = reader.read_array::<{ std::mem::size_of::<$impl_type>() }>()?;
                    Ok(<$impl_type>::from_be_bytes(bytes))
                }

                fn byte_length(&self) -> usize {
                    std::mem::size_of::<$impl_type>()
                }
            }

            impl ConstByteLength for $impl_type {
                fn const_byte_length() -> usize {
                    std::mem::size_of::<$impl_type>()
                }
            }
        )*
    };
}

impl_serde_for_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

// Booleans

impl Serde for bool {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_byte(u8::from(*self));
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(SerdeErr::InvalidBool { byte }),
        }
    }

    fn byte_length(&self) -> usize {
        1
    }
}

impl ConstByteLength for bool {
    fn const_byte_length() -> usize {
        1
    }
}

// Unit

impl Serde for () {
    fn ser(&self, _: &mut ByteWriter) {}

    fn de(_: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(())
    }

    fn byte_length(&self) -> usize {
        0
    }
}
