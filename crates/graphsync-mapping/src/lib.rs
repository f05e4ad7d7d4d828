//! # graphsync-mapping
//!
//! Turns graph write operations into search-index write actions.
//!
//! ## Key components
//!
//! - [`Expr`] / [`ExpressionCache`]: restricted expression language
//!   over entity fields, compiled once per distinct source string
//! - [`RuleProjector`]: evaluates one projection rule against an
//!   entity and shapes its document
//! - [`MappingStrategy`]: the write-path contract; one operation in,
//!   zero or more backend actions out, plus index provisioning
//! - [`SingleIndexMapping`]: one layout, one index per entity kind
//! - [`RuleRoutedMapping`]: rule-driven fan-out across many indices
//! - [`build_strategy`]: closed registry from configuration to
//!   strategy
//!
//! ## Write path
//!
//! ```text
//! WriteOperation -> MappingStrategy::actions -> SearchIndexClient::bulk
//! ```

pub mod error;
pub mod expr;
pub mod parser;
pub mod projector;
pub mod rules;
pub mod single;
pub mod strategy;

pub use error::{MappingError, ProjectionError};
pub use expr::{Expr, ExprError, ExprValue, ExpressionCache};
pub use parser::parse_expression;
pub use projector::{default_document, is_expression, RuleProjector};
pub use rules::RuleRoutedMapping;
pub use single::{SingleIndexMapping, TYPE_FIELD};
pub use strategy::{build_strategy, MappingStrategy};
