//! Single-index-per-kind mapping.
//!
//! One fixed document layout and two indices total: one for nodes, one
//! for relationships. Every document carries a `__type` discriminator
//! (labels for nodes, type for relationships) so callers can filter by
//! entity type with an exact match on the keyword sub-field the
//! provisioning step installs.

use serde_json::{json, Value};

use graphsync_types::{
    DocumentRepresentation, EntityKind, EntityRepresentation, IndexAction, MappingDefaults,
    SearchIndexClient, SyncConfig, WriteOperation,
};

use crate::error::MappingError;
use crate::projector::default_document;
use crate::strategy::{provision_index, MappingStrategy};

/// Discriminator field added to every document.
pub const TYPE_FIELD: &str = "__type";

pub struct SingleIndexMapping {
    defaults: MappingDefaults,
}

impl SingleIndexMapping {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            defaults: config.defaults(),
        }
    }

    fn document(
        &self,
        entity: &dyn EntityRepresentation,
    ) -> Result<DocumentRepresentation, MappingError> {
        let mut doc = default_document(entity, &self.defaults)?;

        let discriminator = match entity.kind() {
            EntityKind::Node => json!(entity.labels()),
            EntityKind::Relationship => json!(entity.relationship_type()),
        };
        doc.fields.insert(TYPE_FIELD.to_string(), discriminator);

        Ok(doc)
    }

    fn upsert(&self, entity: &dyn EntityRepresentation) -> Result<Vec<IndexAction>, MappingError> {
        Ok(vec![IndexAction::Upsert(self.document(entity)?)])
    }

    fn delete(&self, entity: &dyn EntityRepresentation) -> Result<Vec<IndexAction>, MappingError> {
        // routing only; the field map is gone from the index anyway
        let doc = default_document(entity, &self.defaults)?;
        Ok(vec![IndexAction::delete_of(&doc)])
    }

    /// Keyword `raw` sub-field for exact matching on the discriminator.
    fn type_field_schema() -> Value {
        json!({
            "properties": {
                TYPE_FIELD: {
                    "type": "text",
                    "fields": {
                        "raw": { "type": "keyword" }
                    }
                }
            }
        })
    }
}

impl MappingStrategy for SingleIndexMapping {
    fn actions(&self, operation: &WriteOperation) -> Result<Vec<IndexAction>, MappingError> {
        match operation {
            WriteOperation::NodeCreated(node) => self.upsert(node),
            WriteOperation::NodeUpdated { current, .. } => self.upsert(current),
            WriteOperation::NodeDeleted(node) => self.delete(node),
            WriteOperation::RelationshipCreated(rel) => self.upsert(rel),
            WriteOperation::RelationshipUpdated { current, .. } => self.upsert(current),
            WriteOperation::RelationshipDeleted(rel) => self.delete(rel),
        }
    }

    fn ensure_indices(&self, client: &dyn SearchIndexClient) -> Result<(), MappingError> {
        let node_index = self.index_for(EntityKind::Node);
        let relationship_index = self.index_for(EntityKind::Relationship);

        let mut indices = vec![node_index];
        if !indices.contains(&relationship_index) {
            indices.push(relationship_index);
        }

        let schema = Self::type_field_schema();
        for index in &indices {
            provision_index(client, index, Some(&schema))?;
        }
        Ok(())
    }

    fn index_for(&self, kind: EntityKind) -> String {
        self.defaults.index_for(kind).to_string()
    }

    fn name(&self) -> &str {
        "single-index"
    }
}
