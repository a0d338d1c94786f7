use std::collections::BTreeMap;

use mirror_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::{types::ObjectId, value::Value, ObjectEvent, ObjectEventKind, Version};

/// Credentials presented during the handshake
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Client build the server checks for compatibility
    pub version: String,
    pub ident: Option<String>,
    pub language: Option<String>,
    pub region: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_ident(mut self, ident: impl Into<String>) -> Self {
        self.ident = Some(ident.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

impl Serde for Credentials {
    fn ser(&self, writer: &mut ByteWriter) {
        self.username.ser(writer);
        self.password.ser(writer);
        self.version.ser(writer);
        self.ident.ser(writer);
        self.language.ser(writer);
        self.region.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            username: String::de(reader)?,
            password: String::de(reader)?,
            version: String::de(reader)?,
            ident: Option::de(reader)?,
            language: Option::de(reader)?,
            region: Option::de(reader)?,
        })
    }

    fn byte_length(&self) -> usize {
        self.username.byte_length()
            + self.password.byte_length()
            + self.version.byte_length()
            + self.ident.byte_length()
            + self.language.byte_length()
            + self.region.byte_length()
    }
}

/// Reason the server gave for refusing a handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCode {
    NoSuchUser,
    InvalidPassword,
    ServerError,
    ServerUnavailable,
    FailedToSecure,
    Other(String),
}

impl AuthCode {
    const TAG_OTHER: u8 = 0xFF;

    pub fn describe(&self) -> &str {
        match self {
            AuthCode::NoSuchUser => "Invalid username",
            AuthCode::InvalidPassword => "Invalid password",
            AuthCode::ServerError => "Internal server error",
            AuthCode::ServerUnavailable => "Server unavailable",
            AuthCode::FailedToSecure => "Could not secure connection",
            AuthCode::Other(message) => message,
        }
    }
}

impl std::fmt::Display for AuthCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

impl Serde for AuthCode {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            AuthCode::NoSuchUser => writer.write_byte(1),
            AuthCode::InvalidPassword => writer.write_byte(2),
            AuthCode::ServerError => writer.write_byte(3),
            AuthCode::ServerUnavailable => writer.write_byte(4),
            AuthCode::FailedToSecure => writer.write_byte(5),
            AuthCode::Other(message) => {
                writer.write_byte(Self::TAG_OTHER);
                message.ser(writer);
            }
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            1 => Ok(AuthCode::NoSuchUser),
            2 => Ok(AuthCode::InvalidPassword),
            3 => Ok(AuthCode::ServerError),
            4 => Ok(AuthCode::ServerUnavailable),
            5 => Ok(AuthCode::FailedToSecure),
            Self::TAG_OTHER => Ok(AuthCode::Other(String::de(reader)?)),
            tag => Err(SerdeErr::UnknownTag {
                type_name: "AuthCode",
                tag,
            }),
        }
    }

    fn byte_length(&self) -> usize {
        match self {
            AuthCode::Other(message) => 1 + message.byte_length(),
            _ => 1,
        }
    }
}

/// An object the server grants as part of a successful handshake
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapObject {
    pub object_id: ObjectId,
    pub version: Version,
    pub class: String,
    pub fields: BTreeMap<String, Value>,
}

impl BootstrapObject {
    /// The event that installs this object into a registry
    pub fn to_event(&self) -> ObjectEvent {
        ObjectEvent {
            object_id: self.object_id,
            version: self.version,
            kind: ObjectEventKind::Added {
                class: self.class.clone(),
                fields: self.fields.clone(),
            },
        }
    }
}

impl Serde for BootstrapObject {
    fn ser(&self, writer: &mut ByteWriter) {
        self.object_id.ser(writer);
        self.version.ser(writer);
        self.class.ser(writer);
        self.fields.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            object_id: ObjectId::de(reader)?,
            version: Version::de(reader)?,
            class: String::de(reader)?,
            fields: BTreeMap::de(reader)?,
        })
    }

    fn byte_length(&self) -> usize {
        self.object_id.byte_length()
            + self.version.byte_length()
            + self.class.byte_length()
            + self.fields.byte_length()
    }
}

/// Everything a successful handshake hands the client
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BootstrapData {
    /// Session token issued by the server
    pub token: String,
    pub connection_id: u32,
    /// The object representing this client on the server
    pub client_object_id: ObjectId,
    /// Service name to the object id that backs it
    pub services: BTreeMap<String, ObjectId>,
    pub objects: Vec<BootstrapObject>,
}

impl BootstrapData {
    pub fn service_object(&self, service: &str) -> Option<ObjectId> {
        self.services.get(service).copied()
    }
}

impl Serde for BootstrapData {
    fn ser(&self, writer: &mut ByteWriter) {
        self.token.ser(writer);
        self.connection_id.ser(writer);
        self.client_object_id.ser(writer);
        self.services.ser(writer);
        self.objects.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            token: String::de(reader)?,
            connection_id: u32::de(reader)?,
            client_object_id: ObjectId::de(reader)?,
            services: BTreeMap::de(reader)?,
            objects: Vec::de(reader)?,
        })
    }

    fn byte_length(&self) -> usize {
        self.token.byte_length()
            + self.connection_id.byte_length()
            + self.client_object_id.byte_length()
            + self.services.byte_length()
            + self.objects.byte_length()
    }
}

/// The server's answer to an `AuthRequest`
#[derive(Debug, Clone, PartialEq)]
pub enum AuthResponse {
    Success(BootstrapData),
    Failure(AuthCode),
}

impl Serde for AuthResponse {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            AuthResponse::Success(data) => {
                writer.write_byte(0);
                data.ser(writer);
            }
            AuthResponse::Failure(code) => {
                writer.write_byte(1);
                code.ser(writer);
            }
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(AuthResponse::Success(BootstrapData::de(reader)?)),
            1 => Ok(AuthResponse::Failure(AuthCode::de(reader)?)),
            tag => Err(SerdeErr::UnknownTag {
                type_name: "AuthResponse",
                tag,
            }),
        }
    }

    fn byte_length(&self) -> usize {
        1 + match self {
            AuthResponse::Success(data) => data.byte_length(),
            AuthResponse::Failure(code) => code.byte_length(),
        }
    }
}
