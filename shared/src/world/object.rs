use std::collections::{BTreeMap, BTreeSet};

use crate::{ObjectId, ResourceId, Value, Version};

/// Immutable copy of a distributed object at one version.
///
/// Later events never affect a snapshot already handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSnapshot {
    object_id: ObjectId,
    class: String,
    version: Version,
    fields: BTreeMap<String, Value>,
}

impl ObjectSnapshot {
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

// Registry-owned state of one mirrored object
pub(crate) struct DistributedObject {
    pub(crate) object_id: ObjectId,
    pub(crate) class: String,
    pub(crate) version: Version,
    pub(crate) fields: BTreeMap<String, Value>,
    pub(crate) desynchronized: bool,
    pub(crate) references: BTreeSet<ResourceId>,
}

impl DistributedObject {
    pub(crate) fn new(
        object_id: ObjectId,
        version: Version,
        class: String,
        fields: BTreeMap<String, Value>,
    ) -> Self {
        let mut object = Self {
            object_id,
            class,
            version,
            fields,
            desynchronized: false,
            references: BTreeSet::new(),
        };
        object.references = object.collect_references();
        object
    }

    pub(crate) fn collect_references(&self) -> BTreeSet<ResourceId> {
        let mut references = BTreeSet::new();
        for value in self.fields.values() {
            value.collect_refs(&mut references);
        }
        references
    }

    pub(crate) fn snapshot(&self) -> ObjectSnapshot {
        ObjectSnapshot {
            object_id: self.object_id,
            class: self.class.clone(),
            version: self.version,
            fields: self.fields.clone(),
        }
    }
}
