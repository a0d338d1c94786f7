use std::{collections::HashMap, path::Path};

use futures::{future::BoxFuture, FutureExt};
use log::info;

use mirror_shared::{ByteReader, ByteWriter, Definition, ResourceId, Serde, Value};

use crate::{DefinitionError, DefinitionSource};

/// Definitions shipped on disk next to the client.
///
/// The file is a run of entries, each a big-endian `u32` byte length followed
/// by one `Value::Map` definition.
pub struct BundleSource {
    definitions: HashMap<ResourceId, Definition>,
}

impl BundleSource {
    /// Reads and parses a bundle without blocking the runtime
    pub async fn load(path: &Path) -> Result<Self, DefinitionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|error| DefinitionError::BundleIo {
                path: path.display().to_string(),
                reason: error.to_string(),
            })?;
        let source = Self::parse(&bytes)?;
        info!(
            "loaded {} definitions from bundle {}",
            source.len(),
            path.display()
        );
        Ok(source)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, DefinitionError> {
        let mut reader = ByteReader::new(bytes);
        let mut definitions = HashMap::new();
        while !reader.is_empty() {
            let offset = reader.position();
            let malformed = |reason: String| DefinitionError::MalformedBundle { offset, reason };

            let length = reader
                .read_length(1)
                .map_err(|error| malformed(error.to_string()))?;
            let entry = reader
                .read_bytes(length)
                .map_err(|error| malformed(error.to_string()))?;

            let mut entry_reader = ByteReader::new(entry);
            let value = Value::de(&mut entry_reader).map_err(|error| malformed(error.to_string()))?;
            if !entry_reader.is_empty() {
                return Err(malformed(format!(
                    "{} trailing bytes",
                    entry_reader.remaining()
                )));
            }
            let definition = Definition::from_value(&value)
                .ok_or_else(|| malformed("not a definition".to_string()))?;
            definitions.insert(definition.id.clone(), definition);
        }
        Ok(Self { definitions })
    }

    pub fn from_definitions(definitions: impl IntoIterator<Item = Definition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(|definition| (definition.id.clone(), definition))
                .collect(),
        }
    }

    /// Encodes definitions in bundle format
    pub fn encode<'a>(definitions: impl IntoIterator<Item = &'a Definition>) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        for definition in definitions {
            let mut entry = ByteWriter::new();
            definition.to_value().ser(&mut entry);
            writer.write_length(entry.bytes_written());
            writer.write_bytes(entry.as_slice());
        }
        writer.to_bytes()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl DefinitionSource for BundleSource {
    fn name(&self) -> &str {
        "bundle"
    }

    fn fetch(
        &self,
        resource_id: ResourceId,
    ) -> BoxFuture<'static, Result<Option<Definition>, DefinitionError>> {
        let found = self.definitions.get(&resource_id).cloned();
        futures::future::ready(Ok(found)).boxed()
    }
}
