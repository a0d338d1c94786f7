use std::sync::Arc;

use thiserror::Error;

use mirror_shared::{AppliedEvent, FieldChange, ObjectId, ObjectSnapshot, Value};

/// Something that happened to a subscribed object
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The object is resident; first event every subscriber receives
    ObjectAvailable { snapshot: Arc<ObjectSnapshot> },
    /// A fresh snapshot replaced a desynchronized copy
    ObjectResynchronized { snapshot: Arc<ObjectSnapshot> },
    FieldsChanged {
        snapshot: Arc<ObjectSnapshot>,
        changes: Vec<FieldChange>,
    },
    ElementAdded {
        snapshot: Arc<ObjectSnapshot>,
        field: String,
        index: u32,
        value: Value,
    },
    ElementRemoved {
        snapshot: Arc<ObjectSnapshot>,
        field: String,
        index: u32,
        value: Value,
    },
    ElementUpdated {
        snapshot: Arc<ObjectSnapshot>,
        field: String,
        index: u32,
        old: Value,
        new: Value,
    },
    /// The object is gone, either revoked by the server or torn down with the
    /// session. `snapshot` is its final state.
    ObjectRevoked { snapshot: Arc<ObjectSnapshot> },
}

impl SessionEvent {
    pub fn snapshot(&self) -> &Arc<ObjectSnapshot> {
        match self {
            SessionEvent::ObjectAvailable { snapshot }
            | SessionEvent::ObjectResynchronized { snapshot }
            | SessionEvent::FieldsChanged { snapshot, .. }
            | SessionEvent::ElementAdded { snapshot, .. }
            | SessionEvent::ElementRemoved { snapshot, .. }
            | SessionEvent::ElementUpdated { snapshot, .. }
            | SessionEvent::ObjectRevoked { snapshot } => snapshot,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.snapshot().object_id()
    }

    pub(crate) fn from_applied(applied: AppliedEvent) -> Self {
        match applied {
            AppliedEvent::Added { snapshot } => SessionEvent::ObjectAvailable {
                snapshot: Arc::new(snapshot),
            },
            AppliedEvent::Resynchronized { snapshot } => SessionEvent::ObjectResynchronized {
                snapshot: Arc::new(snapshot),
            },
            AppliedEvent::FieldsChanged { snapshot, changes } => SessionEvent::FieldsChanged {
                snapshot: Arc::new(snapshot),
                changes,
            },
            AppliedEvent::ElementAdded {
                snapshot,
                field,
                index,
                value,
            } => SessionEvent::ElementAdded {
                snapshot: Arc::new(snapshot),
                field,
                index,
                value,
            },
            AppliedEvent::ElementRemoved {
                snapshot,
                field,
                index,
                value,
            } => SessionEvent::ElementRemoved {
                snapshot: Arc::new(snapshot),
                field,
                index,
                value,
            },
            AppliedEvent::ElementUpdated {
                snapshot,
                field,
                index,
                old,
                new,
            } => SessionEvent::ElementUpdated {
                snapshot: Arc::new(snapshot),
                field,
                index,
                old,
                new,
            },
            AppliedEvent::Removed { snapshot, .. } => SessionEvent::ObjectRevoked {
                snapshot: Arc::new(snapshot),
            },
        }
    }
}

/// Returned by a listener that could not handle an event. The dispatcher logs
/// it and carries on with the remaining listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Listener failed: {reason}")]
pub struct ListenerError {
    pub reason: String,
}

impl ListenerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Receives events for the objects it subscribed to
pub trait ObjectListener: Send + Sync {
    fn on_event(&self, event: &SessionEvent) -> Result<(), ListenerError>;
}

impl<F> ObjectListener for F
where
    F: Fn(&SessionEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_event(&self, event: &SessionEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Receives out-of-band server notifications
pub trait NotificationListener: Send + Sync {
    fn on_notification(&self, name: &str, payload: &Value) -> Result<(), ListenerError>;
}

impl<F> NotificationListener for F
where
    F: Fn(&str, &Value) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_notification(&self, name: &str, payload: &Value) -> Result<(), ListenerError> {
        self(name, payload)
    }
}
