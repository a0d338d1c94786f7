use crate::{ObjectId, ObjectSnapshot, SubscriberHandle, Value};

/// One field assignment, with the value it replaced
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub name: String,
    /// `None` when the event introduced the field
    pub old: Option<Value>,
    pub new: Value,
}

/// The outcome of a successfully applied event.
///
/// Every variant carries the object's snapshot after the event, so listeners
/// never need to read back into the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum AppliedEvent {
    Added {
        snapshot: ObjectSnapshot,
    },
    /// A full snapshot replaced an existing (usually desynchronized) object
    Resynchronized {
        snapshot: ObjectSnapshot,
    },
    FieldsChanged {
        snapshot: ObjectSnapshot,
        changes: Vec<FieldChange>,
    },
    ElementAdded {
        snapshot: ObjectSnapshot,
        field: String,
        index: u32,
        value: Value,
    },
    ElementRemoved {
        snapshot: ObjectSnapshot,
        field: String,
        index: u32,
        value: Value,
    },
    ElementUpdated {
        snapshot: ObjectSnapshot,
        field: String,
        index: u32,
        old: Value,
        new: Value,
    },
    /// The object is gone; `snapshot` is its final state and `subscribers`
    /// are the handles whose subscriptions ended with it
    Removed {
        snapshot: ObjectSnapshot,
        subscribers: Vec<SubscriberHandle>,
    },
}

impl AppliedEvent {
    pub fn snapshot(&self) -> &ObjectSnapshot {
        match self {
            AppliedEvent::Added { snapshot }
            | AppliedEvent::Resynchronized { snapshot }
            | AppliedEvent::FieldsChanged { snapshot, .. }
            | AppliedEvent::ElementAdded { snapshot, .. }
            | AppliedEvent::ElementRemoved { snapshot, .. }
            | AppliedEvent::ElementUpdated { snapshot, .. }
            | AppliedEvent::Removed { snapshot, .. } => snapshot,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.snapshot().object_id()
    }
}
