//! Projected index documents and backend write actions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A document as it will be written to the search backend.
///
/// Produced by a projector from an entity representation. The document
/// id is always the entity's external key value; projection fails
/// rather than emit an empty id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRepresentation {
    /// Target index name
    pub index: String,

    /// Document type within the index
    pub doc_type: String,

    /// Document id (the entity's external key, stringified)
    pub doc_id: String,

    /// Field name -> value
    pub fields: HashMap<String, Value>,
}

impl DocumentRepresentation {
    pub fn new(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        doc_id: impl Into<String>,
        fields: HashMap<String, Value>,
    ) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            doc_id: doc_id.into(),
            fields,
        }
    }

    /// Routing identity of this document: where it lives and under which id.
    pub fn target(&self) -> (&str, &str, &str) {
        (&self.index, &self.doc_type, &self.doc_id)
    }
}

/// A single backend write instruction, batched with others for throughput.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IndexAction {
    /// Create or fully replace a document
    Upsert(DocumentRepresentation),

    /// Remove a document by routing identity
    Delete {
        index: String,
        doc_type: String,
        doc_id: String,
    },
}

impl IndexAction {
    pub fn delete_of(document: &DocumentRepresentation) -> Self {
        IndexAction::Delete {
            index: document.index.clone(),
            doc_type: document.doc_type.clone(),
            doc_id: document.doc_id.clone(),
        }
    }

    pub fn index(&self) -> &str {
        match self {
            IndexAction::Upsert(doc) => &doc.index,
            IndexAction::Delete { index, .. } => index,
        }
    }

    pub fn doc_type(&self) -> &str {
        match self {
            IndexAction::Upsert(doc) => &doc.doc_type,
            IndexAction::Delete { doc_type, .. } => doc_type,
        }
    }

    pub fn doc_id(&self) -> &str {
        match self {
            IndexAction::Upsert(doc) => &doc.doc_id,
            IndexAction::Delete { doc_id, .. } => doc_id,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, IndexAction::Delete { .. })
    }
}
