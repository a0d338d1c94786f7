use std::collections::{BTreeMap, BTreeSet};

use mirror_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::types::ResourceId;

/// Deepest nesting of lists and maps accepted from the wire
pub const MAX_VALUE_DEPTH: usize = 64;

/// A self-describing field value.
///
/// Object classes differ in the fields they carry, so every value on the wire
/// is prefixed by a tag naming its type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Reference to a definition that can be resolved through the definition cache
    Ref(ResourceId),
}

impl Value {
    const TAG_NULL: u8 = 0;
    const TAG_BOOL: u8 = 1;
    const TAG_INT: u8 = 2;
    const TAG_FLOAT: u8 = 3;
    const TAG_STR: u8 = 4;
    const TAG_BYTES: u8 = 5;
    const TAG_LIST: u8 = 6;
    const TAG_MAP: u8 = 7;
    const TAG_REF: u8 = 8;

    fn tag(&self) -> u8 {
        match self {
            Value::Null => Self::TAG_NULL,
            Value::Bool(_) => Self::TAG_BOOL,
            Value::Int(_) => Self::TAG_INT,
            Value::Float(_) => Self::TAG_FLOAT,
            Value::Str(_) => Self::TAG_STR,
            Value::Bytes(_) => Self::TAG_BYTES,
            Value::List(_) => Self::TAG_LIST,
            Value::Map(_) => Self::TAG_MAP,
            Value::Ref(_) => Self::TAG_REF,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<&ResourceId> {
        match self {
            Value::Ref(resource) => Some(resource),
            _ => None,
        }
    }

    /// Collects every definition referenced anywhere inside this value
    pub fn collect_refs(&self, output: &mut BTreeSet<ResourceId>) {
        match self {
            Value::Ref(resource) => {
                output.insert(resource.clone());
            }
            Value::List(items) => {
                for item in items {
                    item.collect_refs(output);
                }
            }
            Value::Map(entries) => {
                for item in entries.values() {
                    item.collect_refs(output);
                }
            }
            _ => {}
        }
    }

    fn de_nested(reader: &mut ByteReader, depth: usize) -> Result<Self, SerdeErr> {
        if depth > MAX_VALUE_DEPTH {
            return Err(SerdeErr::NestingTooDeep {
                max: MAX_VALUE_DEPTH,
            });
        }
        let tag = reader.read_byte()?;
        let value = match tag {
            Self::TAG_NULL => Value::Null,
            Self::TAG_BOOL => Value::Bool(bool::de(reader)?),
            Self::TAG_INT => Value::Int(i64::de(reader)?),
            Self::TAG_FLOAT => Value::Float(f64::de(reader)?),
            Self::TAG_STR => Value::Str(String::de(reader)?),
            Self::TAG_BYTES => {
                let length = reader.read_length(1)?;
                Value::Bytes(reader.read_bytes(length)?.to_vec())
            }
            Self::TAG_LIST => {
                let count = reader.read_length(1)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(Self::de_nested(reader, depth + 1)?);
                }
                Value::List(items)
            }
            Self::TAG_MAP => {
                let count = reader.read_length(5)?;
                let mut entries = BTreeMap::new();
                for _ in 0..count {
                    let key = String::de(reader)?;
                    let item = Self::de_nested(reader, depth + 1)?;
                    entries.insert(key, item);
                }
                Value::Map(entries)
            }
            Self::TAG_REF => Value::Ref(String::de(reader)?),
            tag => {
                return Err(SerdeErr::UnknownTag {
                    type_name: "Value",
                    tag,
                })
            }
        };
        Ok(value)
    }
}

impl Serde for Value {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_byte(self.tag());
        match self {
            Value::Null => {}
            Value::Bool(value) => value.ser(writer),
            Value::Int(value) => value.ser(writer),
            Value::Float(value) => value.ser(writer),
            Value::Str(value) | Value::Ref(value) => value.ser(writer),
            Value::Bytes(bytes) => {
                writer.write_length(bytes.len());
                writer.write_bytes(bytes);
            }
            Value::List(items) => {
                writer.write_length(items.len());
                for item in items {
                    item.ser(writer);
                }
            }
            Value::Map(entries) => {
                writer.write_length(entries.len());
                for (key, item) in entries {
                    key.ser(writer);
                    item.ser(writer);
                }
            }
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Self::de_nested(reader, 0)
    }

    fn byte_length(&self) -> usize {
        1 + match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 8,
            Value::Str(value) | Value::Ref(value) => value.byte_length(),
            Value::Bytes(bytes) => 4 + bytes.len(),
            Value::List(items) => 4 + items.iter().map(Serde::byte_length).sum::<usize>(),
            Value::Map(entries) => {
                4 + entries
                    .iter()
                    .map(|(key, item)| key.byte_length() + item.byte_length())
                    .sum::<usize>()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}
