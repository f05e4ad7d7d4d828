//! # graphsync-search
//!
//! Query path for graph-sync: run a caller-supplied query against the
//! backend index for an entity kind, parse the hit envelope into
//! ranked matches, and resolve each match's external key back to a
//! live graph entity inside one read transaction.
//!
//! ```text
//! query, kind -> Searcher -> parse_hits -> resolve -> [SearchMatch]
//! ```
//!
//! The graph store, key resolver and backend client are collaborator
//! traits; implementations live with the embedding application.

pub mod error;
pub mod graph;
pub mod matches;
pub mod searcher;

pub use error::SearchError;
pub use graph::{GraphAccessError, GraphReader, KeyNotFound, KeyResolver, ReadTransaction};
pub use matches::{parse_hits, SearchMatch};
pub use searcher::Searcher;
