use futures::{future::BoxFuture, FutureExt};

use mirror_shared::{Definition, ResourceId, Value, DEFINITION_SERVICE};

use crate::{session::SessionLink, DefinitionError, DefinitionSource};

/// Fetches definitions from the server's reserved definitions service.
/// A `Null` result means the server does not know the id.
pub(crate) struct NetworkSource {
    link: SessionLink,
}

impl NetworkSource {
    pub(crate) fn new(link: SessionLink) -> Self {
        Self { link }
    }
}

impl DefinitionSource for NetworkSource {
    fn name(&self) -> &str {
        "server"
    }

    fn fetch(
        &self,
        resource_id: ResourceId,
    ) -> BoxFuture<'static, Result<Option<Definition>, DefinitionError>> {
        let link = self.link.clone();
        async move {
            let value = link
                .invoke(DEFINITION_SERVICE, vec![Value::Str(resource_id.clone())])
                .await
                .map_err(|error| DefinitionError::Fetch {
                    resource_id: resource_id.clone(),
                    source_name: "server".to_string(),
                    reason: error.to_string(),
                })?;
            if value.is_null() {
                return Ok(None);
            }
            match Definition::from_value(&value) {
                Some(definition) => Ok(Some(definition)),
                None => Err(DefinitionError::InvalidDefinition {
                    resource_id,
                    reason: "response is not a definition map".to_string(),
                }),
            }
        }
        .boxed()
    }
}
