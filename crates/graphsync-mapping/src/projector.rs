//! Conditional projection of entities into index documents.
//!
//! A projector evaluates one configured rule against an entity
//! snapshot: does the rule apply, and if so, which index, document
//! type, id and fields does it produce. Rules fan out: every matching
//! rule yields its own document for the same entity.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use graphsync_types::{
    DocumentRepresentation, EntityRepresentation, MappingDefaults, ProjectionRuleConfig,
};

use crate::error::ProjectionError;
use crate::expr::{ExprValue, ExpressionCache};

/// Configured index/type names are expressions when they carry
/// grouping punctuation, literals otherwise.
pub fn is_expression(source: &str) -> bool {
    source.contains('(') && source.contains(')')
}

fn stringify(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        Value::Null => Value::String(String::new()),
        other => Value::String(other.to_string()),
    }
}

/// The external key property value, stringified. Absence is a hard
/// mapping failure, never a default.
fn key_of(
    entity: &dyn EntityRepresentation,
    key_property: &str,
) -> Result<String, ProjectionError> {
    match entity.property(key_property) {
        Some(Value::Null) | None => Err(ProjectionError::MissingKey {
            property: key_property.to_string(),
        }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
    }
}

/// Projection without rules: one document per entity, all properties
/// except blacklisted ones, routed to the kind's default index.
pub fn default_document(
    entity: &dyn EntityRepresentation,
    defaults: &MappingDefaults,
) -> Result<DocumentRepresentation, ProjectionError> {
    let doc_id = key_of(entity, defaults.key_property())?;
    let kind = entity.kind();

    let fields: HashMap<String, Value> = entity
        .properties()
        .iter()
        .filter(|(name, _)| !defaults.is_blacklisted(kind, name))
        .map(|(name, value)| (name.clone(), stringify(value)))
        .collect();

    Ok(DocumentRepresentation::new(
        defaults.index_for(kind),
        kind.as_str(),
        doc_id,
        fields,
    ))
}

/// One projection rule bound to the shared expression cache.
pub struct RuleProjector {
    rule: ProjectionRuleConfig,
    cache: Arc<ExpressionCache>,
}

impl RuleProjector {
    pub fn new(rule: ProjectionRuleConfig, cache: Arc<ExpressionCache>) -> Self {
        Self { rule, cache }
    }

    /// Whether this rule applies to the entity.
    ///
    /// A rule without a condition never matches. A condition that
    /// fails to compile or evaluate is logged and treated as
    /// non-matching so one malformed rule cannot abort the write.
    pub fn matches(&self, entity: &dyn EntityRepresentation) -> bool {
        let Some(condition) = self.rule.condition.as_deref() else {
            return false;
        };

        let verdict = self
            .cache
            .compiled(condition)
            .and_then(|expr| expr.eval(entity))
            .and_then(|value| value.as_bool());

        match verdict {
            Ok(matched) => matched,
            Err(e) => {
                warn!(condition = condition, error = %e, "Invalid condition expression");
                false
            }
        }
    }

    /// Build the document this rule produces for the entity.
    ///
    /// With `build_fields` false only the routing identity (index,
    /// type, id) is computed; used for delete targets where the field
    /// map is irrelevant.
    pub fn document(
        &self,
        entity: &dyn EntityRepresentation,
        defaults: &MappingDefaults,
        build_fields: bool,
    ) -> Result<DocumentRepresentation, ProjectionError> {
        let doc_id = key_of(entity, defaults.key_property())?;
        let kind = entity.kind();

        let index = self.resolve_name(
            self.rule.index.as_deref(),
            defaults.index_for(kind),
            entity,
        )?;
        if index.is_empty() {
            return Err(ProjectionError::EmptyIndexName);
        }

        let doc_type = self.resolve_name(self.rule.doc_type.as_deref(), kind.as_str(), entity)?;
        if doc_type.is_empty() {
            return Err(ProjectionError::EmptyDocType);
        }

        let mut fields = HashMap::new();
        if build_fields {
            for (field, source) in &self.rule.properties {
                let value = self.cache.compiled(source)?.eval(entity)?;
                fields.insert(field.clone(), expr_value_to_json(value));
            }

            if defaults.include_remaining_properties() {
                for (name, value) in entity.properties() {
                    if defaults.is_blacklisted(kind, name) || fields.contains_key(name) {
                        continue;
                    }
                    fields.insert(name.clone(), value.clone());
                }
            }
        }

        Ok(DocumentRepresentation::new(index, doc_type, doc_id, fields))
    }

    /// Resolve a configured name that may be a literal or an
    /// expression, falling back to `fallback` when unconfigured.
    fn resolve_name(
        &self,
        configured: Option<&str>,
        fallback: &str,
        entity: &dyn EntityRepresentation,
    ) -> Result<String, ProjectionError> {
        let source = configured.unwrap_or(fallback);
        if is_expression(source) {
            let value = self.cache.compiled(source)?.eval(entity)?;
            Ok(value.render())
        } else {
            Ok(source.to_string())
        }
    }

    pub fn rule(&self) -> &ProjectionRuleConfig {
        &self.rule
    }
}

fn expr_value_to_json(value: ExprValue) -> Value {
    match value {
        ExprValue::Str(s) => Value::String(s),
        ExprValue::Num(n) => serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ExprValue::Bool(b) => Value::Bool(b),
        ExprValue::List(items) => Value::Array(items.into_iter().map(Value::String).collect()),
        ExprValue::Null => Value::Null,
    }
}
