//! Error types for the mapping layer.

use graphsync_types::TransportError;
use thiserror::Error;

use crate::expr::ExprError;

/// A single entity could not be turned into a valid document.
///
/// Scope: aborts only the affected document. Sibling documents from
/// other rules on the same write operation are unaffected.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The external key property is absent on the source entity
    #[error("Entity has no value for key property \"{property}\"")]
    MissingKey { property: String },

    /// Index name resolved to an empty string
    #[error("Unable to build index name")]
    EmptyIndexName,

    /// Document type resolved to an empty string
    #[error("Unable to build document type name")]
    EmptyDocType,

    /// A configured field expression failed to compile or evaluate
    #[error("Field expression error: {0}")]
    Expression(#[from] ExprError),
}

/// Errors surfaced by mapping strategies.
#[derive(Debug, Error)]
pub enum MappingError {
    /// No valid document could be projected for the entity
    #[error("Document projection failed: {0}")]
    Projection(#[from] ProjectionError),

    /// Index creation or schema application failed; fatal to provisioning
    #[error("Provisioning of index \"{index}\" failed: {message}")]
    Provisioning { index: String, message: String },

    /// Backend unreachable while provisioning
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_display() {
        let err = ProjectionError::MissingKey {
            property: "uuid".to_string(),
        };
        assert!(err.to_string().contains("uuid"));
    }

    #[test]
    fn test_provisioning_display() {
        let err = MappingError::Provisioning {
            index: "graph-node".to_string(),
            message: "shard allocation failed".to_string(),
        };
        assert!(err.to_string().contains("graph-node"));
        assert!(err.to_string().contains("shard allocation failed"));
    }
}
