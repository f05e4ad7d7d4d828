//! Search error types.

use graphsync_types::TransportError;
use thiserror::Error;

/// Errors that can occur during search and resolution.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Backend unreachable; aborts the call, never retried here
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Backend reached but reported the query failed
    #[error("Search backend rejected query: {0}")]
    Backend(String),

    /// Graph store could not open a read transaction
    #[error("Graph access error: {0}")]
    Graph(String),
}
