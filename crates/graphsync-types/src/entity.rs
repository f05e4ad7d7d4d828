//! Graph entity snapshots and write operations.
//!
//! An entity representation is a read-only snapshot of a node or
//! relationship taken at the moment a mutation was captured upstream.
//! Its lifetime is bounded to one write operation or one query
//! resolution call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Property name to scalar value mapping for a graph entity.
pub type PropertyMap = HashMap<String, Value>;

/// Which kind of graph entity an operation or index targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Node,
    Relationship,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Relationship => "relationship",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a node at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRepresentation {
    /// Internal storage id
    pub id: i64,

    /// Labels attached to the node
    pub labels: Vec<String>,

    /// Property name -> scalar value
    pub properties: PropertyMap,
}

impl NodeRepresentation {
    pub fn new(id: i64, labels: Vec<String>, properties: PropertyMap) -> Self {
        Self {
            id,
            labels,
            properties,
        }
    }
}

/// Snapshot of a relationship at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRepresentation {
    /// Internal storage id
    pub id: i64,

    /// Relationship type label
    pub rel_type: String,

    /// Internal id of the start node
    pub start_node_id: i64,

    /// Internal id of the end node
    pub end_node_id: i64,

    /// Property name -> scalar value
    pub properties: PropertyMap,
}

impl RelationshipRepresentation {
    pub fn new(
        id: i64,
        rel_type: impl Into<String>,
        start_node_id: i64,
        end_node_id: i64,
        properties: PropertyMap,
    ) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            start_node_id,
            end_node_id,
            properties,
        }
    }
}

/// Uniform read access to a node or relationship snapshot.
///
/// This is the seam the projection layer works against, so rule
/// evaluation does not care which entity kind it is looking at.
pub trait EntityRepresentation {
    fn kind(&self) -> EntityKind;

    fn internal_id(&self) -> i64;

    fn properties(&self) -> &PropertyMap;

    /// Labels for nodes; empty for relationships.
    fn labels(&self) -> &[String];

    /// Relationship type; `None` for nodes.
    fn relationship_type(&self) -> Option<&str>;

    fn property(&self, name: &str) -> Option<&Value> {
        self.properties().get(name)
    }

    fn has_label(&self, label: &str) -> bool {
        self.labels().iter().any(|l| l == label)
    }
}

impl EntityRepresentation for NodeRepresentation {
    fn kind(&self) -> EntityKind {
        EntityKind::Node
    }

    fn internal_id(&self) -> i64 {
        self.id
    }

    fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn relationship_type(&self) -> Option<&str> {
        None
    }
}

impl EntityRepresentation for RelationshipRepresentation {
    fn kind(&self) -> EntityKind {
        EntityKind::Relationship
    }

    fn internal_id(&self) -> i64 {
        self.id
    }

    fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    fn labels(&self) -> &[String] {
        &[]
    }

    fn relationship_type(&self) -> Option<&str> {
        Some(&self.rel_type)
    }
}

/// A discrete graph mutation, produced upstream and consumed exactly
/// once by a mapping strategy.
///
/// Updated variants carry the representation before and after the
/// mutation; created and deleted variants carry the representation
/// captured at mutation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOperation {
    NodeCreated(NodeRepresentation),
    NodeUpdated {
        previous: NodeRepresentation,
        current: NodeRepresentation,
    },
    NodeDeleted(NodeRepresentation),
    RelationshipCreated(RelationshipRepresentation),
    RelationshipUpdated {
        previous: RelationshipRepresentation,
        current: RelationshipRepresentation,
    },
    RelationshipDeleted(RelationshipRepresentation),
}

impl WriteOperation {
    /// Entity kind this operation refers to.
    pub fn kind(&self) -> EntityKind {
        match self {
            WriteOperation::NodeCreated(_)
            | WriteOperation::NodeUpdated { .. }
            | WriteOperation::NodeDeleted(_) => EntityKind::Node,
            WriteOperation::RelationshipCreated(_)
            | WriteOperation::RelationshipUpdated { .. }
            | WriteOperation::RelationshipDeleted(_) => EntityKind::Relationship,
        }
    }

    /// Short tag for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            WriteOperation::NodeCreated(_) => "node_created",
            WriteOperation::NodeUpdated { .. } => "node_updated",
            WriteOperation::NodeDeleted(_) => "node_deleted",
            WriteOperation::RelationshipCreated(_) => "relationship_created",
            WriteOperation::RelationshipUpdated { .. } => "relationship_updated",
            WriteOperation::RelationshipDeleted(_) => "relationship_deleted",
        }
    }
}
