//! Graph store and key resolver collaborator seams.
//!
//! The graph store itself lives outside this workspace; the searcher
//! only needs a scoped read transaction and id lookups by external
//! key. Transactions are explicit: one handle per `search` call,
//! threaded through the resolution loop, released on drop on every
//! exit path.

use thiserror::Error;

use graphsync_types::{NodeRepresentation, RelationshipRepresentation};

/// External key does not resolve to a live entity.
///
/// A filtering outcome on the query path, not a fatal error: the match
/// is dropped with a diagnostic and the remaining matches survive.
#[derive(Debug, Clone, Error)]
#[error("No entity found for external key \"{key}\"")]
pub struct KeyNotFound {
    pub key: String,
}

impl KeyNotFound {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Maps external keys to internal graph ids.
pub trait KeyResolver: Send + Sync {
    fn node_id(&self, key: &str) -> Result<i64, KeyNotFound>;

    fn relationship_id(&self, key: &str) -> Result<i64, KeyNotFound>;
}

/// Read access to the live graph.
pub trait GraphReader: Send + Sync {
    /// Open one read-only transaction. All entities read through the
    /// returned handle observe the same point-in-time snapshot.
    fn read_transaction(&self) -> Result<Box<dyn ReadTransaction + '_>, GraphAccessError>;
}

/// A scoped read transaction; released when dropped.
pub trait ReadTransaction {
    /// Fetch a node by internal id; `None` when it no longer exists.
    fn node_by_id(&self, id: i64) -> Option<NodeRepresentation>;

    /// Fetch a relationship by internal id; `None` when it no longer
    /// exists.
    fn relationship_by_id(&self, id: i64) -> Option<RelationshipRepresentation>;
}

/// The graph store refused to open a transaction.
#[derive(Debug, Clone, Error)]
#[error("Could not open read transaction: {0}")]
pub struct GraphAccessError(pub String);
