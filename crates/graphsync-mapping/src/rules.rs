//! Rule-routed mapping.
//!
//! Delegates document shaping entirely to the configured projection
//! rules. An entity fans out into one document per matching rule, each
//! with its own index, type and field map, so a single write operation
//! can touch arbitrarily many indices.
//!
//! Update handling is where this variant earns its keep: a rule whose
//! condition flips from true to false across an update leaves a stale
//! document behind unless it is deleted, so updates emit deletes for
//! every target the previous snapshot matched and the current one does
//! not, plus upserts for everything the current snapshot matches.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use graphsync_types::{
    DocumentRepresentation, EntityKind, EntityRepresentation, IndexAction, MappingDefaults,
    SearchIndexClient, SyncConfig, WriteOperation,
};

use crate::error::{MappingError, ProjectionError};
use crate::expr::ExpressionCache;
use crate::projector::{is_expression, RuleProjector};
use crate::single::TYPE_FIELD;
use crate::strategy::{provision_index, MappingStrategy};

pub struct RuleRoutedMapping {
    projectors: Vec<RuleProjector>,
    defaults: MappingDefaults,
}

impl RuleRoutedMapping {
    pub fn new(config: &SyncConfig) -> Self {
        let cache = Arc::new(ExpressionCache::new());
        let projectors = config
            .rules
            .iter()
            .cloned()
            .map(|rule| RuleProjector::new(rule, cache.clone()))
            .collect();

        Self {
            projectors,
            defaults: config.defaults(),
        }
    }

    /// Documents for every rule matching the entity.
    ///
    /// A missing external key invalidates all documents and is
    /// returned; any other projection failure is scoped to its rule's
    /// document and skipped with a diagnostic.
    fn project_matching(
        &self,
        entity: &dyn EntityRepresentation,
        build_fields: bool,
    ) -> Result<Vec<DocumentRepresentation>, MappingError> {
        let mut documents = Vec::new();

        for projector in &self.projectors {
            if !projector.matches(entity) {
                continue;
            }
            match projector.document(entity, &self.defaults, build_fields) {
                Ok(mut doc) => {
                    if build_fields && !doc.fields.contains_key(TYPE_FIELD) {
                        let discriminator = match entity.kind() {
                            EntityKind::Node => json!(entity.labels()),
                            EntityKind::Relationship => json!(entity.relationship_type()),
                        };
                        doc.fields.insert(TYPE_FIELD.to_string(), discriminator);
                    }
                    documents.push(doc);
                }
                Err(e @ ProjectionError::MissingKey { .. }) => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "Skipping document for rule");
                }
            }
        }

        Ok(documents)
    }

    fn upserts(&self, entity: &dyn EntityRepresentation) -> Result<Vec<IndexAction>, MappingError> {
        Ok(self
            .project_matching(entity, true)?
            .into_iter()
            .map(IndexAction::Upsert)
            .collect())
    }

    /// Deletion targets are recomputed from the representation
    /// captured at delete time, under the same rules as creation.
    fn deletes(&self, entity: &dyn EntityRepresentation) -> Result<Vec<IndexAction>, MappingError> {
        Ok(self
            .project_matching(entity, false)?
            .iter()
            .map(IndexAction::delete_of)
            .collect())
    }

    fn update(
        &self,
        previous: &dyn EntityRepresentation,
        current: &dyn EntityRepresentation,
    ) -> Result<Vec<IndexAction>, MappingError> {
        let previous_docs = self.project_matching(previous, false)?;
        let current_docs = self.project_matching(current, true)?;

        let current_targets: HashSet<(String, String, String)> = current_docs
            .iter()
            .map(|d| (d.index.clone(), d.doc_type.clone(), d.doc_id.clone()))
            .collect();

        let mut actions: Vec<IndexAction> = previous_docs
            .iter()
            .filter(|d| {
                !current_targets.contains(&(d.index.clone(), d.doc_type.clone(), d.doc_id.clone()))
            })
            .map(IndexAction::delete_of)
            .collect();

        actions.extend(current_docs.into_iter().map(IndexAction::Upsert));
        Ok(actions)
    }
}

impl MappingStrategy for RuleRoutedMapping {
    fn actions(&self, operation: &WriteOperation) -> Result<Vec<IndexAction>, MappingError> {
        match operation {
            WriteOperation::NodeCreated(node) => self.upserts(node),
            WriteOperation::NodeUpdated { previous, current } => self.update(previous, current),
            WriteOperation::NodeDeleted(node) => self.deletes(node),
            WriteOperation::RelationshipCreated(rel) => self.upserts(rel),
            WriteOperation::RelationshipUpdated { previous, current } => {
                self.update(previous, current)
            }
            WriteOperation::RelationshipDeleted(rel) => self.deletes(rel),
        }
    }

    fn ensure_indices(&self, client: &dyn SearchIndexClient) -> Result<(), MappingError> {
        let mut indices = vec![
            self.index_for(EntityKind::Node),
            self.index_for(EntityKind::Relationship),
        ];

        for projector in &self.projectors {
            match projector.rule().index.as_deref() {
                Some(index) if is_expression(index) => {
                    // cannot be enumerated statically; created by the
                    // backend on first write
                    debug!(index = index, "Skipping expression-valued index");
                }
                Some(index) => indices.push(index.to_string()),
                None => {}
            }
        }

        indices.sort();
        indices.dedup();

        let schema = json!({
            "properties": {
                TYPE_FIELD: {
                    "type": "text",
                    "fields": {
                        "raw": { "type": "keyword" }
                    }
                }
            }
        });

        for index in &indices {
            provision_index(client, index, Some(&schema))?;
        }
        Ok(())
    }

    fn index_for(&self, kind: EntityKind) -> String {
        self.defaults.index_for(kind).to_string()
    }

    fn name(&self) -> &str {
        "rule-routed"
    }
}
