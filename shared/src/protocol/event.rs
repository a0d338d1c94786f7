use std::collections::BTreeMap;

use mirror_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::{
    types::{ObjectId, Version},
    value::Value,
};

/// A server-originated mutation of one distributed object.
///
/// `version` is the object's version token once this event has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEvent {
    pub object_id: ObjectId,
    pub version: Version,
    pub kind: ObjectEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEventKind {
    /// A fresh object, or a full snapshot replacing a desynchronized one
    Added {
        class: String,
        fields: BTreeMap<String, Value>,
    },
    /// One or more fields set atomically
    FieldsChanged { changes: Vec<(String, Value)> },
    ElementAdded { field: String, value: Value },
    ElementRemoved { field: String, index: u32 },
    ElementUpdated {
        field: String,
        index: u32,
        value: Value,
    },
    /// The server revoked the object
    Removed,
}

impl ObjectEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectEventKind::Added { .. } => "Added",
            ObjectEventKind::FieldsChanged { .. } => "FieldsChanged",
            ObjectEventKind::ElementAdded { .. } => "ElementAdded",
            ObjectEventKind::ElementRemoved { .. } => "ElementRemoved",
            ObjectEventKind::ElementUpdated { .. } => "ElementUpdated",
            ObjectEventKind::Removed => "Removed",
        }
    }
}

impl ObjectEvent {
    pub fn added(
        object_id: ObjectId,
        version: Version,
        class: impl Into<String>,
        fields: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            object_id,
            version,
            kind: ObjectEventKind::Added {
                class: class.into(),
                fields,
            },
        }
    }

    pub fn field_changed(
        object_id: ObjectId,
        version: Version,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            object_id,
            version,
            kind: ObjectEventKind::FieldsChanged {
                changes: vec![(field.into(), value.into())],
            },
        }
    }

    pub fn removed(object_id: ObjectId, version: Version) -> Self {
        Self {
            object_id,
            version,
            kind: ObjectEventKind::Removed,
        }
    }
}

impl Serde for ObjectEvent {
    fn ser(&self, writer: &mut ByteWriter) {
        self.object_id.ser(writer);
        self.version.ser(writer);
        match &self.kind {
            ObjectEventKind::Added { class, fields } => {
                writer.write_byte(0);
                class.ser(writer);
                fields.ser(writer);
            }
            ObjectEventKind::FieldsChanged { changes } => {
                writer.write_byte(1);
                changes.ser(writer);
            }
            ObjectEventKind::ElementAdded { field, value } => {
                writer.write_byte(2);
                field.ser(writer);
                value.ser(writer);
            }
            ObjectEventKind::ElementRemoved { field, index } => {
                writer.write_byte(3);
                field.ser(writer);
                index.ser(writer);
            }
            ObjectEventKind::ElementUpdated {
                field,
                index,
                value,
            } => {
                writer.write_byte(4);
                field.ser(writer);
                index.ser(writer);
                value.ser(writer);
            }
            ObjectEventKind::Removed => writer.write_byte(5),
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let object_id = ObjectId::de(reader)?;
        let version = Version::de(reader)?;
        let kind = match reader.read_byte()? {
            0 => ObjectEventKind::Added {
                class: String::de(reader)?,
                fields: BTreeMap::de(reader)?,
            },
            1 => ObjectEventKind::FieldsChanged {
                changes: Vec::de(reader)?,
            },
            2 => ObjectEventKind::ElementAdded {
                field: String::de(reader)?,
                value: Value::de(reader)?,
            },
            3 => ObjectEventKind::ElementRemoved {
                field: String::de(reader)?,
                index: u32::de(reader)?,
            },
            4 => ObjectEventKind::ElementUpdated {
                field: String::de(reader)?,
                index: u32::de(reader)?,
                value: Value::de(reader)?,
            },
            5 => ObjectEventKind::Removed,
            tag => {
                return Err(SerdeErr::UnknownTag {
                    type_name: "ObjectEventKind",
                    tag,
                })
            }
        };
        Ok(Self {
            object_id,
            version,
            kind,
        })
    }

    fn byte_length(&self) -> usize {
        let body = match &self.kind {
            ObjectEventKind::Added { class, fields } => class.byte_length() + fields.byte_length(),
            ObjectEventKind::FieldsChanged { changes } => changes.byte_length(),
            ObjectEventKind::ElementAdded { field, value } => {
                field.byte_length() + value.byte_length()
            }
            ObjectEventKind::ElementRemoved { field, index } => {
                field.byte_length() + index.byte_length()
            }
            ObjectEventKind::ElementUpdated {
                field,
                index,
                value,
            } => field.byte_length() + index.byte_length() + value.byte_length(),
            ObjectEventKind::Removed => 0,
        };
        self.object_id.byte_length() + self.version.byte_length() + 1 + body
    }
}
