use thiserror::Error;

use crate::{version_greater_than, ObjectId, SubscriberHandle, Version};

/// Errors that can occur while applying events to the object registry
///
/// A failed `apply` never leaves an object partially mutated: every check
/// runs before the first field is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Version token did not follow the object's current token
    #[error("Missing update for object {object_id}: expected version {expected}, received {received}")]
    MissingUpdate {
        object_id: ObjectId,
        expected: Version,
        received: Version,
    },

    /// Event targets an object the registry does not hold
    #[error("Object {object_id} not found in registry")]
    ObjectNotFound { object_id: ObjectId },

    /// Object is waiting for a fresh snapshot and refuses incremental events
    #[error("Object {object_id} is desynchronized and awaiting a fresh snapshot")]
    Desynchronized { object_id: ObjectId },

    /// Element operation names a field the object does not have
    #[error("Field '{field}' not found on object {object_id}")]
    FieldNotFound { object_id: ObjectId, field: String },

    /// Element operation names a field that is not a list
    #[error("Field '{field}' on object {object_id} is not a collection")]
    NotACollection { object_id: ObjectId, field: String },

    /// Element index past the end of the list
    #[error("Element index {index} out of bounds for field '{field}' on object {object_id} (length {length})")]
    ElementIndexOutOfBounds {
        object_id: ObjectId,
        field: String,
        index: u32,
        length: usize,
    },

    /// Handle was never issued or has already been released
    #[error("Subscriber handle {handle:?} is not registered")]
    UnknownSubscriber { handle: SubscriberHandle },
}

impl RegistryError {
    /// Whether this is a `MissingUpdate` that skipped ahead of the expected
    /// version, as opposed to a stale or repeated one. Versions wrap, so the
    /// direction is decided modulo 2^32.
    pub fn is_gap(&self) -> bool {
        matches!(
            self,
            RegistryError::MissingUpdate {
                expected, received, ..
            } if version_greater_than(*received, *expected)
        )
    }

    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            RegistryError::MissingUpdate { object_id, .. }
            | RegistryError::ObjectNotFound { object_id }
            | RegistryError::Desynchronized { object_id }
            | RegistryError::FieldNotFound { object_id, .. }
            | RegistryError::NotACollection { object_id, .. }
            | RegistryError::ElementIndexOutOfBounds { object_id, .. } => Some(*object_id),
            RegistryError::UnknownSubscriber { .. } => None,
        }
    }
}
