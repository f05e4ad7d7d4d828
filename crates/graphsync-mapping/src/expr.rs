//! Restricted expression language over graph entities.
//!
//! Projection rules are configured with small boolean/string
//! expressions evaluated against an entity snapshot through a fixed
//! field-access API (`hasLabel`, `getProperty`, `getType`, ...).
//! Nothing outside that API is reachable from configuration.
//!
//! Expressions are compiled once per distinct source string and cached
//! for the lifetime of the configuration; evaluation is read-only and
//! call-local.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use graphsync_types::EntityRepresentation;

use crate::parser::parse_expression;

/// Expression compile or evaluation failure.
#[derive(Debug, Clone, Error)]
pub enum ExprError {
    /// Source string did not parse
    #[error("Expression parse error: {0}")]
    Parse(String),

    /// Function name outside the fixed entity API
    #[error("Unknown function \"{0}\"")]
    UnknownFunction(String),

    /// Operand types do not fit the operator
    #[error("Type error: {0}")]
    Type(String),
}

/// Compiled expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Num(f64),
    Bool(bool),
    /// `hasLabel('Person')`
    HasLabel(String),
    /// `hasProperty('name')`
    HasProperty(String),
    /// `getProperty('name')`
    GetProperty(String),
    /// `getLabels()`
    GetLabels,
    /// `getType()` (relationship type)
    GetType,
    /// `getId()` (internal id)
    GetId,
    Not(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
}

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Str(String),
    Num(f64),
    Bool(bool),
    List(Vec<String>),
    Null,
}

impl ExprValue {
    /// Boolean view for condition evaluation. Absent values are false;
    /// non-boolean values are a type error, not a truthiness guess.
    pub fn as_bool(&self) -> Result<bool, ExprError> {
        match self {
            ExprValue::Bool(b) => Ok(*b),
            ExprValue::Null => Ok(false),
            other => Err(ExprError::Type(format!(
                "expected boolean, got {}",
                other.type_name()
            ))),
        }
    }

    /// String rendering used for document ids, index names and fields.
    pub fn render(&self) -> String {
        match self {
            ExprValue::Str(s) => s.clone(),
            ExprValue::Num(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            ExprValue::Bool(b) => b.to_string(),
            ExprValue::List(items) => items.join(","),
            ExprValue::Null => String::new(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ExprValue::Str(_) => "string",
            ExprValue::Num(_) => "number",
            ExprValue::Bool(_) => "boolean",
            ExprValue::List(_) => "list",
            ExprValue::Null => "null",
        }
    }
}

fn value_of(property: &Value) -> ExprValue {
    match property {
        Value::String(s) => ExprValue::Str(s.clone()),
        Value::Number(n) => ExprValue::Num(n.as_f64().unwrap_or(0.0)),
        Value::Bool(b) => ExprValue::Bool(*b),
        Value::Null => ExprValue::Null,
        Value::Array(items) => ExprValue::List(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        other => ExprValue::Str(other.to_string()),
    }
}

impl Expr {
    /// Evaluate against one entity snapshot.
    pub fn eval(&self, entity: &dyn EntityRepresentation) -> Result<ExprValue, ExprError> {
        match self {
            Expr::Str(s) => Ok(ExprValue::Str(s.clone())),
            Expr::Num(n) => Ok(ExprValue::Num(*n)),
            Expr::Bool(b) => Ok(ExprValue::Bool(*b)),
            Expr::HasLabel(label) => Ok(ExprValue::Bool(entity.has_label(label))),
            Expr::HasProperty(name) => Ok(ExprValue::Bool(entity.property(name).is_some())),
            Expr::GetProperty(name) => Ok(entity
                .property(name)
                .map(value_of)
                .unwrap_or(ExprValue::Null)),
            Expr::GetLabels => Ok(ExprValue::List(entity.labels().to_vec())),
            Expr::GetType => Ok(entity
                .relationship_type()
                .map(|t| ExprValue::Str(t.to_string()))
                .unwrap_or(ExprValue::Null)),
            Expr::GetId => Ok(ExprValue::Num(entity.internal_id() as f64)),
            Expr::Not(inner) => Ok(ExprValue::Bool(!inner.eval(entity)?.as_bool()?)),
            Expr::Eq(lhs, rhs) => Ok(ExprValue::Bool(values_equal(
                &lhs.eval(entity)?,
                &rhs.eval(entity)?,
            ))),
            Expr::Ne(lhs, rhs) => Ok(ExprValue::Bool(!values_equal(
                &lhs.eval(entity)?,
                &rhs.eval(entity)?,
            ))),
            Expr::And(lhs, rhs) => {
                // short-circuit
                if !lhs.eval(entity)?.as_bool()? {
                    return Ok(ExprValue::Bool(false));
                }
                Ok(ExprValue::Bool(rhs.eval(entity)?.as_bool()?))
            }
            Expr::Or(lhs, rhs) => {
                if lhs.eval(entity)?.as_bool()? {
                    return Ok(ExprValue::Bool(true));
                }
                Ok(ExprValue::Bool(rhs.eval(entity)?.as_bool()?))
            }
            Expr::Add(lhs, rhs) => add_values(lhs.eval(entity)?, rhs.eval(entity)?),
        }
    }
}

fn values_equal(lhs: &ExprValue, rhs: &ExprValue) -> bool {
    match (lhs, rhs) {
        (ExprValue::Str(a), ExprValue::Str(b)) => a == b,
        (ExprValue::Num(a), ExprValue::Num(b)) => a == b,
        (ExprValue::Bool(a), ExprValue::Bool(b)) => a == b,
        (ExprValue::List(a), ExprValue::List(b)) => a == b,
        (ExprValue::Null, ExprValue::Null) => true,
        _ => false,
    }
}

fn add_values(lhs: ExprValue, rhs: ExprValue) -> Result<ExprValue, ExprError> {
    match (&lhs, &rhs) {
        (ExprValue::Num(a), ExprValue::Num(b)) => Ok(ExprValue::Num(a + b)),
        (ExprValue::Str(_), _) | (_, ExprValue::Str(_)) => {
            Ok(ExprValue::Str(format!("{}{}", lhs.render(), rhs.render())))
        }
        _ => Err(ExprError::Type(format!(
            "cannot add {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

/// Compile-once cache keyed by expression source.
///
/// Shared across all projection rules; sits on the write hot path, so
/// lookups must not serialize concurrent callers. DashMap gives a
/// lock-free read path with entry-level exclusion on insert.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    compiled: DashMap<String, Arc<Expr>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled form of `source`, compiling on first sight.
    ///
    /// A benign race may compile the same source twice; exactly one
    /// result is kept.
    pub fn compiled(&self, source: &str) -> Result<Arc<Expr>, ExprError> {
        if let Some(existing) = self.compiled.get(source) {
            return Ok(existing.clone());
        }
        let parsed = Arc::new(parse_expression(source)?);
        let entry = self
            .compiled
            .entry(source.to_string())
            .or_insert(parsed)
            .clone();
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}
