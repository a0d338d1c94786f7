//! # Mirror Serde
//! Byte-oriented serialization used by every message that crosses the wire.
//!
//! All integers are written big-endian. Strings and byte arrays carry a `u32`
//! length prefix, sequences a `u32` element count, and options a single
//! presence byte.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod byte_reader;
mod byte_writer;
mod collections;
mod error;
mod number;
mod serde;

pub use byte_reader::ByteReader;
pub use byte_writer::ByteWriter;
pub use error::SerdeErr;
pub use serde::{ConstByteLength, Serde};
