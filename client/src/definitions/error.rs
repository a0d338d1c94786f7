use thiserror::Error;

use mirror_shared::ResourceId;

/// Errors that can occur while resolving a definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// No source knows the requested id
    #[error("Definition '{resource_id}' not found in any source")]
    NotFound { resource_id: ResourceId },

    /// A source returned data that does not describe a definition
    #[error("Invalid definition data for '{resource_id}': {reason}")]
    InvalidDefinition {
        resource_id: ResourceId,
        reason: String,
    },

    /// A source failed while fetching
    #[error("Failed to fetch definition '{resource_id}' from {source_name}: {reason}")]
    Fetch {
        resource_id: ResourceId,
        source_name: String,
        reason: String,
    },

    /// The on-disk bundle could not be read
    #[error("Definition bundle {path} is unreadable: {reason}")]
    BundleIo { path: String, reason: String },

    /// A bundle entry is truncated or does not describe a definition
    #[error("Malformed definition bundle entry at byte {offset}: {reason}")]
    MalformedBundle { offset: usize, reason: String },
}
