use mirror_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::{
    protocol::{
        auth::{AuthResponse, Credentials},
        event::ObjectEvent,
        message_kind::MessageKind,
    },
    types::{ObjectId, RequestId, ServiceId},
    value::Value,
};

/// One unit of the wire protocol, in either direction
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Client to server
    AuthRequest {
        credentials: Credentials,
    },
    Invoke {
        request_id: RequestId,
        service: ServiceId,
        args: Vec<Value>,
    },
    Subscribe {
        object_id: ObjectId,
    },
    Unsubscribe {
        object_id: ObjectId,
    },
    Logoff,

    // Server to client
    AuthResponse(AuthResponse),
    Response {
        request_id: RequestId,
        result: Result<Value, String>,
    },
    ObjectEvent(ObjectEvent),
    Notification {
        name: String,
        payload: Value,
    },
    SubscribeFailed {
        object_id: ObjectId,
        message: String,
    },
    /// The server is terminating the session
    Error {
        message: String,
    },

    // Either direction
    Ping {
        nonce: u32,
    },
    Pong {
        nonce: u32,
    },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::AuthRequest { .. } => MessageKind::AuthRequest,
            Message::Invoke { .. } => MessageKind::Invoke,
            Message::Subscribe { .. } => MessageKind::Subscribe,
            Message::Unsubscribe { .. } => MessageKind::Unsubscribe,
            Message::Logoff => MessageKind::Logoff,
            Message::AuthResponse(_) => MessageKind::AuthResponse,
            Message::Response { .. } => MessageKind::Response,
            Message::ObjectEvent(_) => MessageKind::ObjectEvent,
            Message::Notification { .. } => MessageKind::Notification,
            Message::SubscribeFailed { .. } => MessageKind::SubscribeFailed,
            Message::Error { .. } => MessageKind::Error,
            Message::Ping { .. } => MessageKind::Ping,
            Message::Pong { .. } => MessageKind::Pong,
        }
    }

    /// Writes the kind-specific payload (without the tag)
    pub fn write_body(&self, writer: &mut ByteWriter) {
        match self {
            Message::AuthRequest { credentials } => credentials.ser(writer),
            Message::Invoke {
                request_id,
                service,
                args,
            } => {
                request_id.ser(writer);
                service.ser(writer);
                args.ser(writer);
            }
            Message::Subscribe { object_id } | Message::Unsubscribe { object_id } => {
                object_id.ser(writer)
            }
            Message::Logoff => {}
            Message::AuthResponse(response) => response.ser(writer),
            Message::Response { request_id, result } => {
                request_id.ser(writer);
                match result {
                    Ok(value) => {
                        writer.write_byte(0);
                        value.ser(writer);
                    }
                    Err(message) => {
                        writer.write_byte(1);
                        message.ser(writer);
                    }
                }
            }
            Message::ObjectEvent(event) => event.ser(writer),
            Message::Notification { name, payload } => {
                name.ser(writer);
                payload.ser(writer);
            }
            Message::SubscribeFailed { object_id, message } => {
                object_id.ser(writer);
                message.ser(writer);
            }
            Message::Error { message } => message.ser(writer),
            Message::Ping { nonce } | Message::Pong { nonce } => nonce.ser(writer),
        }
    }

    /// Reads the payload of a message of the given kind
    pub fn read_body(kind: MessageKind, reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let message = match kind {
            MessageKind::AuthRequest => Message::AuthRequest {
                credentials: Credentials::de(reader)?,
            },
            MessageKind::Invoke => Message::Invoke {
                request_id: RequestId::de(reader)?,
                service: ServiceId::de(reader)?,
                args: Vec::de(reader)?,
            },
            MessageKind::Subscribe => Message::Subscribe {
                object_id: ObjectId::de(reader)?,
            },
            MessageKind::Unsubscribe => Message::Unsubscribe {
                object_id: ObjectId::de(reader)?,
            },
            MessageKind::Logoff => Message::Logoff,
            MessageKind::AuthResponse => Message::AuthResponse(AuthResponse::de(reader)?),
            MessageKind::Response => {
                let request_id = RequestId::de(reader)?;
                let result = match reader.read_byte()? {
                    0 => Ok(Value::de(reader)?),
                    1 => Err(String::de(reader)?),
                    tag => {
                        return Err(SerdeErr::UnknownTag {
                            type_name: "Response",
                            tag,
                        })
                    }
                };
                Message::Response { request_id, result }
            }
            MessageKind::ObjectEvent => Message::ObjectEvent(ObjectEvent::de(reader)?),
            MessageKind::Notification => Message::Notification {
                name: String::de(reader)?,
                payload: Value::de(reader)?,
            },
            MessageKind::SubscribeFailed => Message::SubscribeFailed {
                object_id: ObjectId::de(reader)?,
                message: String::de(reader)?,
            },
            MessageKind::Error => Message::Error {
                message: String::de(reader)?,
            },
            MessageKind::Ping => Message::Ping {
                nonce: u32::de(reader)?,
            },
            MessageKind::Pong => Message::Pong {
                nonce: u32::de(reader)?,
            },
        };
        Ok(message)
    }
}
