use std::collections::{BTreeSet, HashMap};

use crate::ObjectId;

/// Opaque token naming one subscriber's interest in one object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberHandle(u64);

impl SubscriberHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Relation table between objects and subscriber handles.
///
/// Handles are never embedded in objects; both directions are indexed here.
#[derive(Default)]
pub struct SubscriptionTable {
    next_handle: u64,
    by_handle: HashMap<SubscriberHandle, ObjectId>,
    by_object: HashMap<ObjectId, BTreeSet<SubscriberHandle>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object_id: ObjectId) -> SubscriberHandle {
        self.next_handle += 1;
        let handle = SubscriberHandle(self.next_handle);
        self.by_handle.insert(handle, object_id);
        self.by_object.entry(object_id).or_default().insert(handle);
        handle
    }

    /// Removes one handle, returning its object and how many handles remain on it
    pub fn remove(&mut self, handle: SubscriberHandle) -> Option<(ObjectId, usize)> {
        let object_id = self.by_handle.remove(&handle)?;
        let remaining = match self.by_object.get_mut(&object_id) {
            Some(handles) => {
                handles.remove(&handle);
                handles.len()
            }
            None => 0,
        };
        if remaining == 0 {
            self.by_object.remove(&object_id);
        }
        Some((object_id, remaining))
    }

    /// Removes every handle on an object
    pub fn remove_object(&mut self, object_id: ObjectId) -> Vec<SubscriberHandle> {
        let handles: Vec<SubscriberHandle> = self
            .by_object
            .remove(&object_id)
            .map(|handles| handles.into_iter().collect())
            .unwrap_or_default();
        for handle in &handles {
            self.by_handle.remove(handle);
        }
        handles
    }

    pub fn object_of(&self, handle: SubscriberHandle) -> Option<ObjectId> {
        self.by_handle.get(&handle).copied()
    }

    /// Handles on an object, in issue order
    pub fn subscribers(&self, object_id: ObjectId) -> Vec<SubscriberHandle> {
        self.by_object
            .get(&object_id)
            .map(|handles| handles.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, object_id: ObjectId) -> usize {
        self.by_object.get(&object_id).map_or(0, BTreeSet::len)
    }

    pub fn clear(&mut self) {
        self.by_handle.clear();
        self.by_object.clear();
    }
}
