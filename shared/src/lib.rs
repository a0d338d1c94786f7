//! # Mirror Shared
//! Wire protocol, frame codec and distributed object registry shared by the
//! mirror client and its test server.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use mirror_serde::{ByteReader, ByteWriter, ConstByteLength, Serde, SerdeErr};

mod codec;
mod protocol;
mod types;
mod value;
mod world;
mod wrapping_version;

pub use codec::{
    error::CodecError,
    wire_codec::{WireCodec, DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_SIZE, FRAME_TAG_SIZE},
};
pub use protocol::{
    auth::{AuthCode, AuthResponse, BootstrapData, BootstrapObject, Credentials},
    definition::{Definition, DEFINITION_SERVICE},
    event::{ObjectEvent, ObjectEventKind},
    message::Message,
    message_kind::MessageKind,
};
pub use types::{ObjectId, RequestId, ResourceId, ServiceId, Version};
pub use value::{Value, MAX_VALUE_DEPTH};
pub use world::{
    applied_event::{AppliedEvent, FieldChange},
    error::RegistryError,
    object::ObjectSnapshot,
    registry::ObjectRegistry,
    subscriptions::{SubscriberHandle, SubscriptionTable},
    tracker::DefinitionTracker,
};
pub use wrapping_version::{version_greater_than, version_less_than};
