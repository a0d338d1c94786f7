use crate::ResourceId;

/// Receives pin/unpin notifications for definitions referenced by live objects.
///
/// The registry calls `retain` once per live object per distinct definition
/// it references, and `release` exactly once for each earlier `retain`.
pub trait DefinitionTracker: Send + Sync {
    fn retain(&self, resource_id: &ResourceId);
    fn release(&self, resource_id: &ResourceId);
}
