//! # graphsync-types
//!
//! Shared domain types for graph-sync: graph entity snapshots, write
//! operations, projected index documents, backend write actions, the
//! search-backend client capability, and configuration.
//!
//! Everything here is a value type or a trait seam; behavior lives in
//! `graphsync-mapping` and `graphsync-search`.

pub mod client;
pub mod config;
pub mod document;
pub mod entity;
pub mod error;

pub use client::{ClientResult, SearchIndexClient};
pub use config::{MappingDefaults, MappingVariant, ProjectionRuleConfig, SyncConfig};
pub use document::{DocumentRepresentation, IndexAction};
pub use entity::{
    EntityKind, EntityRepresentation, NodeRepresentation, PropertyMap,
    RelationshipRepresentation, WriteOperation,
};
pub use error::{ConfigError, TransportError};
