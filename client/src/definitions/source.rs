use futures::future::BoxFuture;

use mirror_shared::{Definition, ResourceId};

use crate::DefinitionError;

/// Somewhere definitions can be fetched from.
///
/// `Ok(None)` means this source does not know the id and the next source
/// should be asked.
pub trait DefinitionSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(
        &self,
        resource_id: ResourceId,
    ) -> BoxFuture<'static, Result<Option<Definition>, DefinitionError>>;
}
