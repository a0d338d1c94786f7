pub mod error;
pub mod wire_codec;
