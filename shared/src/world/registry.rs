use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use log::{debug, warn};

use crate::{
    world::object::DistributedObject, AppliedEvent, DefinitionTracker, FieldChange, ObjectEvent,
    ObjectEventKind, ObjectId, ObjectSnapshot, RegistryError, ResourceId, SubscriberHandle,
    SubscriptionTable, Value, Version,
};

/// Client-side mirror of every distributed object granted to one session.
///
/// The registry has a single writer. Reads hand out snapshots, never
/// references into the table.
pub struct ObjectRegistry {
    objects: HashMap<ObjectId, DistributedObject>,
    subscriptions: SubscriptionTable,
    // objects that stay resident with no subscribers (bootstrap grants)
    retained: HashSet<ObjectId>,
    tracker: Option<Arc<dyn DefinitionTracker>>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            subscriptions: SubscriptionTable::new(),
            retained: HashSet::new(),
            tracker: None,
        }
    }

    /// Registry that pins referenced definitions through `tracker`
    pub fn with_tracker(tracker: Arc<dyn DefinitionTracker>) -> Self {
        let mut registry = Self::new();
        registry.tracker = Some(tracker);
        registry
    }

    // Objects

    pub fn get(&self, object_id: ObjectId) -> Option<ObjectSnapshot> {
        self.objects.get(&object_id).map(DistributedObject::snapshot)
    }

    pub fn contains(&self, object_id: ObjectId) -> bool {
        self.objects.contains_key(&object_id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn version(&self, object_id: ObjectId) -> Option<Version> {
        self.objects.get(&object_id).map(|object| object.version)
    }

    pub fn is_desynchronized(&self, object_id: ObjectId) -> bool {
        self.objects
            .get(&object_id)
            .is_some_and(|object| object.desynchronized)
    }

    /// Refuses further incremental events for `object_id` until a fresh
    /// `Added` snapshot arrives. Returns false if the object is not held.
    pub fn mark_desynchronized(&mut self, object_id: ObjectId) -> bool {
        match self.objects.get_mut(&object_id) {
            Some(object) => {
                object.desynchronized = true;
                true
            }
            None => false,
        }
    }

    /// Keeps `object_id` resident even when it has no subscribers
    pub fn retain_object(&mut self, object_id: ObjectId) {
        self.retained.insert(object_id);
    }

    pub fn is_retained(&self, object_id: ObjectId) -> bool {
        self.retained.contains(&object_id)
    }

    /// Applies one server event.
    ///
    /// Incremental events must carry exactly the current version + 1. On any
    /// error the object is left exactly as it was.
    pub fn apply(&mut self, event: ObjectEvent) -> Result<AppliedEvent, RegistryError> {
        let ObjectEvent {
            object_id,
            version,
            kind,
        } = event;

        match kind {
            ObjectEventKind::Added { class, fields } => {
                Ok(self.install(object_id, version, class, fields))
            }
            ObjectEventKind::Removed => self.remove(object_id),
            ObjectEventKind::FieldsChanged { changes } => {
                let object = self.sequenced_mut(object_id, version)?;
                let mut applied = Vec::with_capacity(changes.len());
                for (name, new) in changes {
                    let old = object.fields.insert(name.clone(), new.clone());
                    applied.push(FieldChange { name, old, new });
                }
                object.version = version;
                let snapshot = object.snapshot();
                self.refresh_references(object_id);
                Ok(AppliedEvent::FieldsChanged {
                    snapshot,
                    changes: applied,
                })
            }
            ObjectEventKind::ElementAdded { field, value } => {
                let object = self.sequenced_mut(object_id, version)?;
                let list = list_field_mut(object_id, &mut object.fields, &field)?;
                let index = u32::try_from(list.len()).map_err(|_| {
                    RegistryError::ElementIndexOutOfBounds {
                        object_id,
                        field: field.clone(),
                        index: u32::MAX,
                        length: list.len(),
                    }
                })?;
                list.push(value.clone());
                object.version = version;
                let snapshot = object.snapshot();
                self.refresh_references(object_id);
                Ok(AppliedEvent::ElementAdded {
                    snapshot,
                    field,
                    index,
                    value,
                })
            }
            ObjectEventKind::ElementRemoved { field, index } => {
                let object = self.sequenced_mut(object_id, version)?;
                let list = list_field_mut(object_id, &mut object.fields, &field)?;
                check_index(object_id, &field, index, list.len())?;
                let value = list.remove(index as usize);
                object.version = version;
                let snapshot = object.snapshot();
                self.refresh_references(object_id);
                Ok(AppliedEvent::ElementRemoved {
                    snapshot,
                    field,
                    index,
                    value,
                })
            }
            ObjectEventKind::ElementUpdated {
                field,
                index,
                value,
            } => {
                let object = self.sequenced_mut(object_id, version)?;
                let list = list_field_mut(object_id, &mut object.fields, &field)?;
                check_index(object_id, &field, index, list.len())?;
                let old = std::mem::replace(&mut list[index as usize], value.clone());
                object.version = version;
                let snapshot = object.snapshot();
                self.refresh_references(object_id);
                Ok(AppliedEvent::ElementUpdated {
                    snapshot,
                    field,
                    index,
                    old,
                    new: value,
                })
            }
        }
    }

    // Subscriptions

    /// Registers interest in `object_id`. The object need not be resident yet.
    pub fn subscribe(&mut self, object_id: ObjectId) -> SubscriberHandle {
        let handle = self.subscriptions.insert(object_id);
        debug!("subscriber {:?} added to object {}", handle, object_id);
        handle
    }

    /// Drops one subscriber. When it was the last one on an object that is not
    /// retained, the object is dropped too and its id is returned so the caller
    /// can tell the server.
    pub fn unsubscribe(
        &mut self,
        handle: SubscriberHandle,
    ) -> Result<Option<ObjectId>, RegistryError> {
        let (object_id, remaining) = self
            .subscriptions
            .remove(handle)
            .ok_or(RegistryError::UnknownSubscriber { handle })?;
        debug!(
            "subscriber {:?} removed from object {}, {} remaining",
            handle, object_id, remaining
        );

        if remaining > 0 || self.retained.contains(&object_id) {
            return Ok(None);
        }
        if let Some(object) = self.objects.remove(&object_id) {
            self.release_all(&object.references);
        }
        Ok(Some(object_id))
    }

    pub fn subscribers(&self, object_id: ObjectId) -> Vec<SubscriberHandle> {
        self.subscriptions.subscribers(object_id)
    }

    pub fn subscriber_count(&self, object_id: ObjectId) -> usize {
        self.subscriptions.count(object_id)
    }

    pub fn subscribed_object(&self, handle: SubscriberHandle) -> Option<ObjectId> {
        self.subscriptions.object_of(handle)
    }

    /// Ends every subscription on an object the server refused to grant
    pub fn drop_subscribers(&mut self, object_id: ObjectId) -> Vec<SubscriberHandle> {
        self.subscriptions.remove_object(object_id)
    }

    /// Tears down every object, releasing all definition pins.
    ///
    /// Returns each object's final snapshot with the handles that were
    /// subscribed to it.
    pub fn clear(&mut self) -> Vec<(ObjectSnapshot, Vec<SubscriberHandle>)> {
        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort_unstable();

        let mut revoked = Vec::with_capacity(ids.len());
        for object_id in ids {
            if let Some(object) = self.objects.remove(&object_id) {
                self.release_all(&object.references);
                let handles = self.subscriptions.remove_object(object_id);
                revoked.push((object.snapshot(), handles));
            }
        }
        self.subscriptions.clear();
        self.retained.clear();
        revoked
    }

    // Internals

    fn install(
        &mut self,
        object_id: ObjectId,
        version: Version,
        class: String,
        fields: std::collections::BTreeMap<String, Value>,
    ) -> AppliedEvent {
        let object = DistributedObject::new(object_id, version, class, fields);
        self.retain_all(&object.references);
        let snapshot = object.snapshot();

        match self.objects.insert(object_id, object) {
            Some(previous) => {
                self.release_all(&previous.references);
                if previous.desynchronized {
                    debug!("object {} resynchronized at version {}", object_id, version);
                } else {
                    debug!("object {} replaced by fresh snapshot", object_id);
                }
                AppliedEvent::Resynchronized { snapshot }
            }
            None => AppliedEvent::Added { snapshot },
        }
    }

    fn remove(&mut self, object_id: ObjectId) -> Result<AppliedEvent, RegistryError> {
        let object = self
            .objects
            .remove(&object_id)
            .ok_or(RegistryError::ObjectNotFound { object_id })?;
        self.release_all(&object.references);
        self.retained.remove(&object_id);
        let subscribers = self.subscriptions.remove_object(object_id);
        Ok(AppliedEvent::Removed {
            snapshot: object.snapshot(),
            subscribers,
        })
    }

    fn sequenced_mut(
        &mut self,
        object_id: ObjectId,
        version: Version,
    ) -> Result<&mut DistributedObject, RegistryError> {
        let object = self
            .objects
            .get_mut(&object_id)
            .ok_or(RegistryError::ObjectNotFound { object_id })?;
        if object.desynchronized {
            return Err(RegistryError::Desynchronized { object_id });
        }
        let expected = object.version.wrapping_add(1);
        if version != expected {
            return Err(RegistryError::MissingUpdate {
                object_id,
                expected,
                received: version,
            });
        }
        Ok(object)
    }

    fn refresh_references(&mut self, object_id: ObjectId) {
        let Some(object) = self.objects.get_mut(&object_id) else {
            return;
        };
        let current = object.collect_references();
        if current == object.references {
            return;
        }
        let previous = std::mem::replace(&mut object.references, current.clone());
        let added: BTreeSet<ResourceId> = current.difference(&previous).cloned().collect();
        let dropped: BTreeSet<ResourceId> = previous.difference(&current).cloned().collect();
        self.retain_all(&added);
        self.release_all(&dropped);
    }

    fn retain_all(&self, references: &BTreeSet<ResourceId>) {
        if let Some(tracker) = &self.tracker {
            for resource_id in references {
                tracker.retain(resource_id);
            }
        }
    }

    fn release_all(&self, references: &BTreeSet<ResourceId>) {
        if let Some(tracker) = &self.tracker {
            for resource_id in references {
                tracker.release(resource_id);
            }
        }
    }
}

fn list_field_mut<'a>(
    object_id: ObjectId,
    fields: &'a mut std::collections::BTreeMap<String, Value>,
    field: &str,
) -> Result<&'a mut Vec<Value>, RegistryError> {
    match fields.get_mut(field) {
        Some(Value::List(items)) => Ok(items),
        Some(_) => Err(RegistryError::NotACollection {
            object_id,
            field: field.to_string(),
        }),
        None => {
            warn!("element event for missing field '{}' on object {}", field, object_id);
            Err(RegistryError::FieldNotFound {
                object_id,
                field: field.to_string(),
            })
        }
    }
}

fn check_index(
    object_id: ObjectId,
    field: &str,
    index: u32,
    length: usize,
) -> Result<(), RegistryError> {
    if (index as usize) < length {
        Ok(())
    } else {
        Err(RegistryError::ElementIndexOutOfBounds {
            object_id,
            field: field.to_string(),
            index,
            length,
        })
    }
}
