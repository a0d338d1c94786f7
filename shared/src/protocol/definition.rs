use std::collections::BTreeMap;

use crate::{types::ResourceId, value::Value};

/// Reserved service id through which definitions are fetched from the server
pub const DEFINITION_SERVICE: &str = "definitions";

/// Immutable resource metadata (item templates and the like), shared by every
/// object that references it
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub id: ResourceId,
    pub kind: String,
    pub properties: BTreeMap<String, Value>,
}

impl Definition {
    pub fn new(id: impl Into<ResourceId>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Encodes this definition as the map carried in fetch responses and bundles
    pub fn to_value(&self) -> Value {
        let mut entries = BTreeMap::new();
        entries.insert("id".to_string(), Value::Str(self.id.clone()));
        entries.insert("kind".to_string(), Value::Str(self.kind.clone()));
        entries.insert("properties".to_string(), Value::Map(self.properties.clone()));
        Value::Map(entries)
    }

    /// Parses the map form produced by `to_value`, returning `None` if a
    /// required entry is missing or has the wrong type
    pub fn from_value(value: &Value) -> Option<Self> {
        let entries = value.as_map()?;
        let id = entries.get("id")?.as_str()?.to_string();
        let kind = entries.get("kind")?.as_str()?.to_string();
        let properties = match entries.get("properties") {
            Some(Value::Map(properties)) => properties.clone(),
            Some(Value::Null) | None => BTreeMap::new(),
            Some(_) => return None,
        };
        Some(Self {
            id,
            kind,
            properties,
        })
    }
}
